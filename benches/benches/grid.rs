// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use kurbo::{Point, Rect};
use nodeflow_grid::{GridConfig, Spatial, SpatialGrid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Clone, Debug)]
struct Item {
    id: u32,
    rect: Rect,
}

impl Spatial for Item {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// `count` node-sized boxes scattered over a `world` x `world` canvas.
fn gen_items(count: u32, world: f64, seed: u64) -> Vec<Item> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|id| {
            let x = rng.random_range(0.0..world);
            let y = rng.random_range(0.0..world);
            let w = rng.random_range(80.0..240.0);
            let h = rng.random_range(40.0..160.0);
            Item {
                id,
                rect: Rect::new(x, y, x + w, y + h),
            }
        })
        .collect()
}

fn gen_points(count: usize, world: f64, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point::new(rng.random_range(0.0..world), rng.random_range(0.0..world)))
        .collect()
}

fn build(items: &[Item], config: GridConfig) -> SpatialGrid<Item> {
    let mut grid = SpatialGrid::with_config(config);
    for item in items {
        grid.insert(item.clone());
    }
    grid
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_insert");
    for &n in &[1_000_u32, 10_000] {
        let items = gen_items(n, 20_000.0, 0x6121_D000_0000_0001);
        group.throughput(Throughput::Elements(u64::from(n)));
        for cell in [128.0, 256.0, 512.0] {
            group.bench_function(BenchmarkId::new(format!("cell={cell}"), n), |b| {
                b.iter_batched(
                    || items.clone(),
                    |items| {
                        let mut grid = SpatialGrid::with_config(GridConfig::default().with_cell_size(cell));
                        for item in items {
                            grid.insert(item);
                        }
                        grid
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_query_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_query_point");
    let points = gen_points(256, 20_000.0, 0x6121_D000_0000_0002);
    group.throughput(Throughput::Elements(points.len() as u64));
    for &n in &[1_000_u32, 10_000] {
        let items = gen_items(n, 20_000.0, 0x6121_D000_0000_0001);
        let grid = build(&items, GridConfig::default());
        group.bench_function(BenchmarkId::new("radius=0", n), |b| {
            b.iter(|| {
                for p in &points {
                    black_box(grid.query_point(*p, 0.0));
                }
            });
        });
        group.bench_function(BenchmarkId::new("radius=8", n), |b| {
            b.iter(|| {
                for p in &points {
                    black_box(grid.query_point(*p, 8.0));
                }
            });
        });
    }
    group.finish();
}

fn bench_query_rect(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_query_rect");
    let items = gen_items(10_000, 20_000.0, 0x6121_D000_0000_0001);
    let viewport = Rect::new(4_000.0, 4_000.0, 5_920.0, 5_080.0);
    for cache in [false, true] {
        let grid = build(&items, GridConfig::default().with_query_cache(cache));
        group.bench_function(BenchmarkId::new("viewport", format!("cache={cache}")), |b| {
            b.iter(|| black_box(grid.query(black_box(viewport)).len()));
        });
    }
    group.finish();
}

fn bench_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_drag");
    let items = gen_items(10_000, 20_000.0, 0x6121_D000_0000_0001);
    let dragged: Vec<u32> = (0..16).collect();
    group.throughput(Throughput::Elements(100));
    for (label, drag_mode) in [("immediate", false), ("drag_mode", true)] {
        group.bench_function(label, |b| {
            b.iter_batched(
                || build(&items, GridConfig::default()),
                |mut grid| {
                    if drag_mode {
                        grid.start_dragging(dragged.iter().copied());
                    }
                    // 100 frames: move the selection and re-send a few static items,
                    // as redundant UI updates tend to.
                    for frame in 0..100_u32 {
                        let dx = f64::from(frame) * 3.0;
                        for &id in &dragged {
                            let rect = items[id as usize].rect + kurbo::Vec2::new(dx, dx);
                            grid.insert(Item { id, rect });
                        }
                        for item in &items[1_000..1_064] {
                            grid.insert(item.clone());
                        }
                        black_box(grid.query_point(Point::new(500.0 + dx, 500.0 + dx), 0.0));
                    }
                    if drag_mode {
                        grid.end_dragging();
                    }
                    grid
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_query_point, bench_query_rect, bench_drag);
criterion_main!(benches);
