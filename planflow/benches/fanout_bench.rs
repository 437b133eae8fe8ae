//! Benchmarks for parallel fan-out and sequential execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use planflow::plan::{Plan, Step};
use planflow::runner::PlanRunner;
use planflow::testing::{fan_out, NoOpAction};
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn fanout_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let runner = PlanRunner::new();
    let mut group = c.benchmark_group("parallel_fan_out");

    for width in [10_usize, 100, 1000] {
        let plan = Plan::new("fan-out", fan_out("root", width, Duration::ZERO)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(width), &plan, |b, plan| {
            b.iter(|| black_box(rt.block_on(runner.run(plan)).unwrap()));
        });
    }
    group.finish();
}

fn sequential_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let runner = PlanRunner::new();
    let steps = (0..100)
        .map(|i| Step::leaf(format!("leaf-{i}"), NoOpAction))
        .collect();
    let plan = Plan::new("chain", Step::sequential("root", steps)).unwrap();

    c.bench_function("sequential_100", |b| {
        b.iter(|| black_box(rt.block_on(runner.run(&plan)).unwrap()));
    });
}

criterion_group!(benches, fanout_benchmark, sequential_benchmark);
criterion_main!(benches);
