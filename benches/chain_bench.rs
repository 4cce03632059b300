// Benchmarks for building, rebuilding and walking a segment chain.
//
// - full_build: flatten a whole tree
// - random_rebuild: grow random nodes one child at a time
// - churn: remove and re-insert random subtrees
// - cursor_walk: visit every attribute-flagged element

use criterion::{
    BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use widget_index::{AttributeCursor, ListConfig, SegmentChain};
use widget_index_verify::{NodeId, TestTree};

// =============================================================================
// Benchmark Helpers
// =============================================================================

/// A tree of roughly `size` nodes, wide near the root and deep at the leaves.
fn sample_tree(size: usize, rng: &mut StdRng) -> (TestTree, NodeId) {
    let mut tree = TestTree::new();
    let root = tree.root();
    let mut nodes = vec![root];
    while tree.len() < size {
        let parent = nodes[rng.gen_range(0..nodes.len())];
        let child = tree.add_child(parent);
        tree.node_mut(child).attributes = rng.gen_bool(0.2);
        nodes.push(child);
    }
    return (tree, root);
}

fn built(size: usize, config: &ListConfig, seed: u64) -> (TestTree, NodeId, SegmentChain<NodeId>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut tree, root) = sample_tree(size, &mut rng);
    let mut chain = SegmentChain::with_config(config.clone()).unwrap();
    chain.build_from(&mut tree, root);
    return (tree, root, chain);
}

fn configs() -> [(&'static str, ListConfig); 2] {
    return [
        ("default", ListConfig::default()),
        ("small_segments", ListConfig::default().with_segment_capacity(64)),
    ];
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_full_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_build");
    for size in [1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(size as u64));
        for (name, config) in configs() {
            let mut rng = StdRng::seed_from_u64(7);
            let (tree, root) = sample_tree(size, &mut rng);
            group.bench_with_input(BenchmarkId::new(name, size), &tree, |b, tree| {
                let mut tree = tree.clone();
                let mut chain = SegmentChain::with_config(config.clone()).unwrap();
                b.iter(|| {
                    chain.build_from(&mut tree, root);
                    black_box(chain.len())
                });
            });
        }
    }
    group.finish();
}

fn bench_random_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_rebuild");
    let edits = 1_000;
    group.throughput(Throughput::Elements(edits as u64));
    for size in [1_000, 10_000] {
        for (name, config) in configs() {
            group.bench_function(BenchmarkId::new(name, size), |b| {
                b.iter_batched(
                    || built(size, &config, 11),
                    |(mut tree, _root, mut chain)| {
                        let mut rng = StdRng::seed_from_u64(13);
                        for _ in 0..edits {
                            let node = NodeId(rng.gen_range(0..tree.len() as u32));
                            tree.add_child(node);
                            chain.rebuild_subtree(&mut tree, node, &mut ()).unwrap();
                        }
                        black_box(chain.stats().relabeled_segments)
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    let rounds = 500;
    group.throughput(Throughput::Elements(rounds as u64));
    for (name, config) in configs() {
        group.bench_function(BenchmarkId::new(name, 10_000), |b| {
            b.iter_batched(
                || built(10_000, &config, 17),
                |(mut tree, _root, mut chain)| {
                    let mut rng = StdRng::seed_from_u64(19);
                    for _ in 0..rounds {
                        let node = NodeId(rng.gen_range(1..tree.len() as u32));
                        if chain.resolve(&tree, node).is_err() {
                            continue;
                        }
                        tree.node_mut(node).present = false;
                        chain.rebuild_subtree(&mut tree, node, &mut ()).unwrap();
                        tree.node_mut(node).present = true;
                        if let Some(parent) = tree.node(node).parent {
                            if chain.resolve(&tree, parent).is_ok() {
                                chain.rebuild_subtree(&mut tree, parent, &mut ()).unwrap();
                            }
                        }
                    }
                    black_box(chain.len())
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_cursor_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_walk");
    for size in [10_000, 100_000] {
        let (_tree, _root, chain) = built(size, &ListConfig::default(), 23);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &chain, |b, chain| {
            b.iter(|| {
                let mut cursor = AttributeCursor::new();
                let mut visited = 0;
                while cursor.next(chain).is_some() {
                    visited += 1;
                }
                black_box(visited)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_full_build,
    bench_random_rebuild,
    bench_churn,
    bench_cursor_walk,
);
criterion_main!(benches);
