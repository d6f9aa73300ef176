//! Criterion benchmarks for model building and the two search backends.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use u_rotation::cp::{CpSolver, SolveLimits};
use u_rotation::rotation::{ModelBuilder, RotationParams, Scheduler};
use u_rotation::search::{AnnealingSolver, BacktrackingSolver};

/// (teams, activities, capacity), all satisfiable.
const INSTANCES: &[(usize, usize, usize)] = &[(8, 4, 2), (12, 4, 3), (24, 6, 4)];

fn params(&(teams, activities, capacity): &(usize, usize, usize)) -> RotationParams {
    RotationParams::new(teams, activities, capacity).unwrap()
}

fn label(&(teams, activities, capacity): &(usize, usize, usize)) -> String {
    format!("{teams}x{activities}x{capacity}")
}

fn bench_model_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_build");

    for instance in INSTANCES {
        let p = params(instance);
        group.bench_with_input(BenchmarkId::from_parameter(label(instance)), &p, |b, p| {
            b.iter(|| black_box(ModelBuilder::new(black_box(p)).build()))
        });
    }
    group.finish();
}

fn bench_backtracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtracking");
    group.sample_size(10);

    let limits = SolveLimits::default();
    for instance in INSTANCES {
        let scheduler = Scheduler::new(params(instance));
        group.bench_with_input(
            BenchmarkId::from_parameter(label(instance)),
            &scheduler,
            |b, s| {
                b.iter(|| {
                    let outcome = s.schedule(&BacktrackingSolver::new(), black_box(&limits));
                    black_box(outcome)
                })
            },
        );
    }
    group.finish();
}

fn bench_annealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("annealing");
    group.sample_size(10);

    let limits = SolveLimits::default();
    let solver = AnnealingSolver::new().with_seed(7);
    for instance in INSTANCES {
        let model = ModelBuilder::new(&params(instance)).build();
        group.bench_with_input(
            BenchmarkId::from_parameter(label(instance)),
            &model,
            |b, m| b.iter(|| black_box(solver.solve(black_box(m), &limits))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_model_build, bench_backtracking, bench_annealing);
criterion_main!(benches);
