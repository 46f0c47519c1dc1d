//! Benchmarks for the pluggable expand strategies.
//!
//! These compare the two queue-expansion forms on synthetic batch shapes
//! and through a full stepper run, so a swap of the default strategy has
//! numbers behind it.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::sync::Arc;

use hyperway::graph::Graph;
use hyperway::pack::ArgPack;
use hyperway::stepper::{expand, Row, StepperConfig};
use hyperway::unit::UnitId;
use hyperway::utils::testing::{adder, passthrough, printer};

/// Build `batches` successor batches of `width` unit rows each.
fn build_batches(batches: usize, width: usize) -> (Graph, Vec<Vec<Row>>) {
    let mut graph = Graph::new();
    let ids: Vec<UnitId> = (0..width).map(|_| graph.as_unit(passthrough())).collect();
    let rows = (0..batches)
        .map(|b| {
            ids.iter()
                .map(|&unit| Row::Unit {
                    unit,
                    pack: ArgPack::of(b as i64),
                })
                .collect()
        })
        .collect();
    (graph, rows)
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    for &batches in &[16usize, 64, 256] {
        let (_graph, shape) = build_batches(batches, 4);

        group.bench_with_input(
            BenchmarkId::new("accumulate", batches),
            &shape,
            |b, shape| {
                b.iter_batched(
                    || shape.clone(),
                    expand::accumulate,
                    BatchSize::SmallInput,
                );
            },
        );
        group.bench_with_input(BenchmarkId::new("concat", batches), &shape, |b, shape| {
            b.iter_batched(|| shape.clone(), expand::concat, BatchSize::SmallInput);
        });
    }
    group.finish();
}

/// A fan-out graph: one hub, `width` middle units, one shared sink.
fn fan_graph(width: usize) -> (Graph, UnitId) {
    let mut graph = Graph::new();
    let hub = graph.as_unit(adder(0));
    let sink = graph.as_unit(printer());
    for _ in 0..width {
        let mid = graph.as_unit(adder(1));
        graph.add(hub, mid);
        graph.add(mid, sink);
    }
    (graph, hub)
}

fn bench_stepper_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("stepper_run");
    for &width in &[8usize, 64] {
        let (graph, hub) = fan_graph(width);

        group.bench_with_input(BenchmarkId::new("accumulate", width), &graph, |b, graph| {
            b.iter(|| {
                let mut stepper = graph.stepper();
                stepper.prepare(hub, ArgPack::of(0));
                stepper.run(None).expect("run");
                stepper.stash().total()
            });
        });
        group.bench_with_input(BenchmarkId::new("concat", width), &graph, |b, graph| {
            b.iter(|| {
                let mut stepper = graph.stepper_with(StepperConfig {
                    expand: Arc::new(expand::concat),
                    ..Default::default()
                });
                stepper.prepare(hub, ArgPack::of(0));
                stepper.run(None).expect("run");
                stepper.stash().total()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_stepper_run);
criterion_main!(benches);
