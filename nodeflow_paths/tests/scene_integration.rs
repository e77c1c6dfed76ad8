// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The path cache and the scene index working together through a drag.

use kurbo::{Point, Rect};
use nodeflow_paths::{ConnectionPathCache, ConnectionStyle, PathError, PathKind};
use nodeflow_scene::{
    Connection, ConnectionId, Node, NodeId, Port, PortId, PortRef, PortSide, SceneIndex,
};

fn node(id: &str, x: f64, y: f64) -> Node {
    Node::new(id, Rect::new(x, y, x + 100.0, y + 60.0))
        .with_port(Port::input("in", PortSide::Left))
        .with_port(Port::output("out", PortSide::Right))
}

fn link(id: &str, source: &str, target: &str) -> Connection {
    Connection::new(id, PortRef::new(source, "out"), PortRef::new(target, "in"))
}

/// Recompute and re-index every connection attached to `moved`.
fn reroute(
    scene: &mut SceneIndex,
    cache: &mut ConnectionPathCache,
    moved: &NodeId,
    style: &ConnectionStyle,
) -> Result<(), PathError> {
    let ids = scene.connections_for_node(moved).to_vec();
    for id in ids {
        let Some(connection) = scene.connection(&id).cloned() else {
            continue;
        };
        let (Some(source), Some(target)) =
            (scene.node(&connection.source), scene.node(&connection.target))
        else {
            continue;
        };
        let segments = cache.segments_for(&connection, source, target, style)?;
        scene.update_connection(connection, segments);
    }
    Ok(())
}

fn scene_with_chain(style: &ConnectionStyle) -> (SceneIndex, ConnectionPathCache) {
    let mut scene = SceneIndex::new();
    let mut cache = ConnectionPathCache::new();
    scene.update(node("a", 0.0, 0.0));
    scene.update(node("b", 300.0, 0.0));
    scene.update(node("c", 600.0, 0.0));
    scene.update_connection(link("ab", "a", "b"), []);
    scene.update_connection(link("bc", "b", "c"), []);
    for id in ["a", "c"] {
        reroute(&mut scene, &mut cache, &NodeId::from(id), style).expect("valid endpoints");
    }
    (scene, cache)
}

#[test]
fn precise_hits_go_through_the_cache() {
    let style = ConnectionStyle::default().with_kind(PathKind::Straight);
    let mut scene = SceneIndex::new();
    let mut cache = ConnectionPathCache::new();
    scene.update(node("a", 0.0, 0.0));
    scene.update(node("b", 300.0, 300.0));
    scene.update_connection(link("ab", "a", "b"), []);
    reroute(&mut scene, &mut cache, &NodeId::from("a"), &style).expect("valid endpoints");

    // The line runs from (100, 30) to (300, 330).
    let on_ab = Point::new(200.0, 180.0);
    assert_eq!(scene.hit_test_with(on_ab, &cache).connection(), Some(&ConnectionId::from("ab")));
    // Inside the diagonal's segment box, but far off the stroke.
    let off_ab = Point::new(280.0, 60.0);
    assert_eq!(scene.hit_test(off_ab).connection(), Some(&ConnectionId::from("ab")));
    assert!(scene.hit_test_with(off_ab, &cache).is_canvas());
    assert!(scene.connections_at_with(off_ab, 0.0, &cache).is_empty());
}

#[test]
fn dragged_node_connections_are_stale_until_rerouted() {
    let style = ConnectionStyle::default();
    let (mut scene, mut cache) = scene_with_chain(&style);
    let b = NodeId::from("b");

    scene.start_dragging([b.clone()]);
    let moved = node("b", 300.0, 300.0);
    scene.update(moved.clone());

    let ab = scene.connection(&ConnectionId::from("ab")).cloned().expect("ab exists");
    let a = scene.node(&NodeId::from("a")).cloned().expect("a exists");
    // The cache is not refreshed by hit testing.
    assert!(!cache.hit_test(&ab, &a, &moved, Point::new(200.0, 30.0), None));
    assert!(!cache.hit_test(&ab, &a, &moved, Point::new(200.0, 180.0), Some(50.0)));

    reroute(&mut scene, &mut cache, &b, &style).expect("valid endpoints");
    scene.end_dragging();

    // The cubic from (100, 30) to (300, 330) is point-symmetric about (200, 180).
    let middle = Point::new(200.0, 180.0);
    assert!(cache.hit_test(&ab, &a, &moved, middle, None));
    assert_eq!(scene.hit_test_with(middle, &cache).connection(), Some(&ConnectionId::from("ab")));
    assert!(scene.hit_test_with(Point::new(200.0, 30.0), &cache).is_canvas());
    assert!(scene.diagnostics().is_consistent());
    assert_eq!(cache.len(), 2);
}

#[test]
fn rerouting_into_a_missing_port_is_an_error() {
    let style = ConnectionStyle::default();
    let (mut scene, mut cache) = scene_with_chain(&style);
    scene.update(Node::new("c", Rect::new(600.0, 0.0, 700.0, 60.0)));

    let err = reroute(&mut scene, &mut cache, &NodeId::from("c"), &style)
        .expect_err("c lost its input port");
    assert_eq!(
        err,
        PathError::MissingPort {
            node: NodeId::from("c"),
            port: PortId::from("in"),
        }
    );
    assert_eq!(err.to_string(), "node c has no port in");
}

#[test]
fn routing_between_the_wrong_nodes_is_an_error() {
    let mut cache = ConnectionPathCache::new();
    let connection = link("ab", "a", "b");
    let err = cache
        .get_or_create_path(&connection, &node("x", 0.0, 0.0), &node("b", 300.0, 0.0), &ConnectionStyle::default())
        .expect_err("x is not the source");
    assert!(matches!(err, PathError::EndpointMismatch { .. }));
    assert!(cache.is_empty());
}
