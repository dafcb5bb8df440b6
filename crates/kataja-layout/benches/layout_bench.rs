//! Benchmarks for the tree layout engines.
//!
//! Run with: cargo bench -p kataja-layout

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use kataja_core::{LayoutConfig, UndoConfig};
use kataja_forest::{Alignment, EdgeType, Forest, ForestSettings, NodeId, NodeType};
use kataja_layout::{Cell, Grid, VISUALIZATIONS, change_visualization};
use std::hint::black_box;

/// A complete binary tree of the given depth.
fn binary_forest(depth: u32) -> Forest {
    let mut forest = Forest::new(&UndoConfig::default(), ForestSettings::default());
    let root = forest.create_node(NodeType::Constituent, "S");
    let mut layer = vec![root];
    for level in 0..depth {
        let mut next = Vec::with_capacity(layer.len() * 2);
        for (i, parent) in layer.iter().enumerate() {
            for align in [Alignment::Left, Alignment::Right] {
                let child = forest.create_node(NodeType::Constituent, &format!("n{level}.{i}"));
                let _ = forest.connect(*parent, child, EdgeType::Constituent, align);
                next.push(child);
            }
        }
        layer = next;
    }
    forest
}

fn bench_engine_draw(c: &mut Criterion) {
    let config = LayoutConfig::default();
    for name in VISUALIZATIONS {
        let mut group = c.benchmark_group(format!("layout/draw/{name}"));
        for depth in [3, 5, 7] {
            group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
                b.iter_batched(
                    || {
                        let mut forest = binary_forest(depth);
                        let _ = change_visualization(&mut forest, name, &config);
                        forest
                    },
                    |mut forest| {
                        forest.draw();
                        black_box(forest)
                    },
                    BatchSize::SmallInput,
                )
            });
        }
        group.finish();
    }
}

fn bench_grid_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/grid_merge");
    for rows in [4, 16, 64] {
        let mut right = Grid::new();
        for y in 0..rows {
            right.set(0, y, Cell::Node(NodeId(y as u32)));
        }
        group.bench_with_input(BenchmarkId::new("rows", rows), &right, |b, right| {
            b.iter_batched(
                || {
                    let mut left = Grid::new();
                    for y in 0..rows {
                        left.set(y % 5, y, Cell::Filler);
                    }
                    left
                },
                |mut left| black_box(left.merge_grids(right, 1)),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine_draw, bench_grid_merge);
criterion_main!(benches);
