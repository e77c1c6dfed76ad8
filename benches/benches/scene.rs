// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};
use nodeflow_paths::{ConnectionPathCache, ConnectionStyle};
use nodeflow_scene::{Connection, Node, NodeId, Port, PortRef, PortSide, SceneIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn node(i: u32, x: f64, y: f64) -> Node {
    Node::new(format!("n{i}"), Rect::new(x, y, x + 160.0, y + 90.0))
        .with_port(Port::input("in", PortSide::Left))
        .with_port(Port::output("out", PortSide::Right))
}

/// A `cols` x `rows` grid of nodes, each wired to its right-hand neighbor.
fn build_scene(cols: u32, rows: u32) -> (SceneIndex, ConnectionPathCache) {
    let mut scene = SceneIndex::new();
    let mut cache = ConnectionPathCache::new();
    let style = ConnectionStyle::default();
    let nodes: Vec<Node> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .map(|(r, c)| node(r * cols + c, f64::from(c) * 240.0, f64::from(r) * 150.0))
        .collect();
    let mut connections = Vec::new();
    for r in 0..rows {
        for c in 1..cols {
            let (s, t) = ((r * cols + c - 1) as usize, (r * cols + c) as usize);
            let link = Connection::new(
                format!("c{t}"),
                PortRef::new(nodes[s].id.clone(), "out"),
                PortRef::new(nodes[t].id.clone(), "in"),
            );
            connections.push(link);
        }
    }
    scene.rebuild(nodes, connections, |link, source, target| {
        cache.segments_for(link, source, target, &style).unwrap_or_default()
    });
    (scene, cache)
}

fn bench_hit_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_hit_test");
    let mut rng = StdRng::seed_from_u64(0x5CE0_0000_0000_0001);
    for &(cols, rows) in &[(10_u32, 10_u32), (40, 25)] {
        let (scene, cache) = build_scene(cols, rows);
        let extent = (f64::from(cols) * 240.0, f64::from(rows) * 150.0);
        let points: Vec<Point> = (0..256)
            .map(|_| Point::new(rng.random_range(0.0..extent.0), rng.random_range(0.0..extent.1)))
            .collect();
        let n = cols * rows;
        group.bench_function(BenchmarkId::new("boxes", n), |b| {
            b.iter(|| {
                for p in &points {
                    black_box(scene.hit_test(*p));
                }
            });
        });
        group.bench_function(BenchmarkId::new("precise", n), |b| {
            b.iter(|| {
                for p in &points {
                    black_box(scene.hit_test_with(*p, &cache));
                }
            });
        });
    }
    group.finish();
}

fn bench_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene_drag");
    let style = ConnectionStyle::default();
    group.bench_function("one_node_100_frames_1000_nodes", |b| {
        b.iter_batched(
            || build_scene(40, 25),
            |(mut scene, mut cache)| {
                let dragged = NodeId::from("n0");
                scene.start_dragging([dragged.clone()]);
                for frame in 0..100_u32 {
                    let d = f64::from(frame) * 4.0;
                    scene.update(node(0, d, d));
                    for id in scene.connections_for_node(&dragged).to_vec() {
                        let Some(link) = scene.connection(&id).cloned() else {
                            continue;
                        };
                        let (Some(source), Some(target)) =
                            (scene.node(&link.source), scene.node(&link.target))
                        else {
                            continue;
                        };
                        let segments = cache
                            .segments_for(&link, source, target, &style)
                            .unwrap_or_default();
                        scene.update_connection(link, segments);
                    }
                    black_box(scene.hit_test(Point::new(80.0 + d, 45.0 + d)));
                }
                scene.end_dragging();
                scene
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_hit_test, bench_drag);
criterion_main!(benches);
