//! Benchmarks for branch order computation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dendron::prelude::*;
use nalgebra::Point3;

/// Tree where every third node extends a chain and the rest fan out.
fn create_bushy_tree(n: usize) -> MorphologyTree {
    let mut catalog = RegionCatalog::new();
    let dend = catalog.get_or_insert("dend[]");

    let nodes: Vec<Node> = (0..n)
        .map(|i| Node::new(Point3::new(i as f64, 0.0, 0.0), 1.0, dend))
        .collect();
    let parents: Vec<Option<usize>> = (0..n)
        .map(|i| match i {
            0 => None,
            i if i % 3 == 0 => Some(i - 1),
            i => Some(i / 2),
        })
        .collect();

    build_from_parents("bench", nodes, &parents, catalog).unwrap()
}

fn bench_node_types(c: &mut Criterion) {
    let tree = create_bushy_tree(10_000);
    c.bench_function("node_types_10k", |b| b.iter(|| node_types(&tree)));
}

fn bench_branch_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch_order");

    for n in [1_000, 10_000] {
        let tree = create_bushy_tree(n);
        let types = node_types(&tree);

        group.bench_with_input(BenchmarkId::new("traversal", n), &n, |b, _| {
            b.iter(|| branch_order(&tree, &types).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("sparse", n), &n, |b, _| {
            b.iter(|| branch_order_sparse(&tree, &types).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_node_types, bench_branch_order);
criterion_main!(benches);
