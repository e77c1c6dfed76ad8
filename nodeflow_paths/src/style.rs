// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connection styles and the path geometry they produce.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{BezPath, Point, Vec2};
use nodeflow_scene::{Connection, Node, NodeId, PortId};

use crate::PathError;

/// Consecutive route points closer than this (squared) are merged.
const MERGE_EPSILON_SQ: f64 = 1e-12;

/// Shape of the curve drawn between two ports.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathKind {
    /// A single line from port to port.
    Straight,
    /// A cubic leaving and entering each port along its outward direction.
    ///
    /// Control points sit `distance * curvature` away from the endpoints, but
    /// never closer than [`ConnectionStyle::port_extension`].
    Bezier {
        /// Fraction of the endpoint distance used for the control arms.
        curvature: f64,
    },
    /// An orthogonal route with rounded corners.
    Step {
        /// Corner radius, clamped to half of the shorter adjoining leg.
        corner_radius: f64,
    },
}

impl Default for PathKind {
    fn default() -> Self {
        Self::Bezier { curvature: 0.25 }
    }
}

/// Everything that shapes a connection path and its hit region.
///
/// Changing any of these for connections that are already cached requires
/// [`ConnectionPathCache::invalidate_all`](crate::ConnectionPathCache::invalidate_all)
/// unless the new style is passed to every subsequent
/// [`get_or_create_path`](crate::ConnectionPathCache::get_or_create_path).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectionStyle {
    /// Curve shape.
    pub kind: PathKind,
    /// Distance between the source port center and the start of the path.
    pub start_gap: f64,
    /// Distance between the target port center and the end of the path.
    pub end_gap: f64,
    /// Minimum straight run out of each port before the path turns.
    pub port_extension: f64,
    /// Drawn stroke width.
    pub stroke_width: f64,
    /// Extra distance beyond the stroke that still counts as a hit.
    pub hit_tolerance: f64,
    /// Flattened lines per hit-test segment box.
    pub segment_lines: usize,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            kind: PathKind::default(),
            start_gap: 0.0,
            end_gap: 0.0,
            port_extension: 20.0,
            stroke_width: 2.0,
            hit_tolerance: 8.0,
            segment_lines: 8,
        }
    }
}

impl ConnectionStyle {
    /// Set the curve shape.
    pub fn with_kind(mut self, kind: PathKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the gaps between the port centers and the path ends.
    pub fn with_gaps(mut self, start_gap: f64, end_gap: f64) -> Self {
        self.start_gap = start_gap;
        self.end_gap = end_gap;
        self
    }

    /// Set the minimum straight run out of each port.
    pub fn with_port_extension(mut self, port_extension: f64) -> Self {
        self.port_extension = port_extension.max(0.0);
        self
    }

    /// Set the stroke width.
    pub fn with_stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = stroke_width.max(0.0);
        self
    }

    /// Set the hit tolerance beyond the stroke.
    pub fn with_hit_tolerance(mut self, hit_tolerance: f64) -> Self {
        self.hit_tolerance = hit_tolerance.max(0.0);
        self
    }

    /// Set how many flattened lines share one segment box. Zero becomes one.
    pub fn with_segment_lines(mut self, segment_lines: usize) -> Self {
        self.segment_lines = segment_lines.max(1);
        self
    }

    /// Distance from the centerline within which a point hits the stroke.
    pub fn hit_radius(&self) -> f64 {
        self.hit_radius_with(self.hit_tolerance)
    }

    /// [`hit_radius`](Self::hit_radius) with `tolerance` in place of
    /// [`hit_tolerance`](Self::hit_tolerance).
    pub fn hit_radius_with(&self, tolerance: f64) -> f64 {
        0.5 * self.stroke_width + tolerance.max(0.0)
    }

    /// Build the drawn path between resolved endpoints.
    pub fn build_path(&self, ends: &Endpoints) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(ends.start);
        match self.kind {
            PathKind::Straight => path.line_to(ends.end),
            PathKind::Bezier { curvature } => {
                let reach = (ends.start.distance(ends.end) * curvature.max(0.0))
                    .max(self.port_extension);
                path.curve_to(
                    ends.start + ends.source_dir * reach,
                    ends.end + ends.target_dir * reach,
                    ends.end,
                );
            }
            PathKind::Step { corner_radius } => {
                let route = step_route(ends, self.port_extension);
                round_corners(&mut path, &route, corner_radius.max(0.0));
            }
        }
        path
    }
}

/// Port positions and directions for one connection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Endpoints {
    /// Visual center of the source port.
    pub source_anchor: Point,
    /// Outward direction of the source port.
    pub source_dir: Vec2,
    /// Visual center of the target port.
    pub target_anchor: Point,
    /// Outward direction of the target port.
    pub target_dir: Vec2,
    /// Path start: the source anchor pushed out by the start gap.
    pub start: Point,
    /// Path end: the target anchor pushed out by the end gap.
    pub end: Point,
}

impl Endpoints {
    /// Resolve the endpoints of `connection` on `source` and `target`.
    ///
    /// Fails if either node is not the one the connection names, or lacks the
    /// named port.
    pub fn resolve(
        connection: &Connection,
        source: &Node,
        target: &Node,
        style: &ConnectionStyle,
    ) -> Result<Self, PathError> {
        let (source_anchor, source_dir) =
            anchor(connection, source, &connection.source, &connection.source_port)?;
        let (target_anchor, target_dir) =
            anchor(connection, target, &connection.target, &connection.target_port)?;
        Ok(Self {
            source_anchor,
            source_dir,
            target_anchor,
            target_dir,
            start: source_anchor + source_dir * style.start_gap,
            end: target_anchor + target_dir * style.end_gap,
        })
    }
}

fn anchor(
    connection: &Connection,
    node: &Node,
    expected: &NodeId,
    port: &PortId,
) -> Result<(Point, Vec2), PathError> {
    if &node.id != expected {
        return Err(PathError::EndpointMismatch {
            connection: connection.id.clone(),
            expected: expected.clone(),
            found: node.id.clone(),
        });
    }
    let port = node.port(port).ok_or_else(|| PathError::MissingPort {
        node: node.id.clone(),
        port: port.clone(),
    })?;
    Ok((node.port_center(port), port.side.outward()))
}

/// Corner points of the orthogonal route, start and end included.
fn step_route(ends: &Endpoints, extension: f64) -> Vec<Point> {
    let lead = ends.start + ends.source_dir * extension;
    let tail = ends.end + ends.target_dir * extension;
    let (bend_a, bend_b) = if ends.source_dir.y == 0.0 {
        let mid = 0.5 * (lead.x + tail.x);
        (Point::new(mid, lead.y), Point::new(mid, tail.y))
    } else {
        let mid = 0.5 * (lead.y + tail.y);
        (Point::new(lead.x, mid), Point::new(tail.x, mid))
    };
    let mut route: Vec<Point> = Vec::with_capacity(6);
    for p in [ends.start, lead, bend_a, bend_b, tail, ends.end] {
        if route
            .last()
            .is_none_or(|last| (p - *last).hypot2() > MERGE_EPSILON_SQ)
        {
            route.push(p);
        }
    }
    route
}

/// Append `route[1..]` to `path`, replacing each interior corner with a quad.
fn round_corners(path: &mut BezPath, route: &[Point], radius: f64) {
    for window in route.windows(3) {
        let (prev, corner, next) = (window[0], window[1], window[2]);
        let into = corner - prev;
        let out = next - corner;
        let r = radius.min(0.5 * into.hypot()).min(0.5 * out.hypot());
        if r <= 0.0 {
            path.line_to(corner);
            continue;
        }
        path.line_to(corner - into.normalize() * r);
        path.quad_to(corner, corner + out.normalize() * r);
    }
    if route.len() > 1
        && let Some(last) = route.last()
    {
        path.line_to(*last);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{PathEl, Rect, Shape};
    use nodeflow_scene::{Port, PortRef, PortSide};

    use super::*;

    fn pair() -> (Node, Node, Connection) {
        let a = Node::new("a", Rect::new(0.0, 0.0, 100.0, 60.0))
            .with_port(Port::output("out", PortSide::Right));
        let b = Node::new("b", Rect::new(300.0, 200.0, 400.0, 260.0))
            .with_port(Port::input("in", PortSide::Left));
        let c = Connection::new("c", PortRef::new("a", "out"), PortRef::new("b", "in"));
        (a, b, c)
    }

    #[test]
    fn gaps_push_endpoints_outward() {
        let (a, b, c) = pair();
        let style = ConnectionStyle::default().with_gaps(5.0, 7.0);
        let ends = Endpoints::resolve(&c, &a, &b, &style).expect("valid endpoints");
        assert_eq!(ends.source_anchor, Point::new(100.0, 30.0));
        assert_eq!(ends.start, Point::new(105.0, 30.0));
        assert_eq!(ends.end, Point::new(293.0, 230.0));
    }

    #[test]
    fn bezier_arms_follow_port_directions() {
        let (a, b, c) = pair();
        let style = ConnectionStyle::default().with_kind(PathKind::Bezier { curvature: 0.5 });
        let ends = Endpoints::resolve(&c, &a, &b, &style).expect("valid endpoints");
        let path = style.build_path(&ends);
        let Some(PathEl::CurveTo(c1, c2, end)) = path.elements().get(1).copied() else {
            panic!("expected a cubic, got {:?}", path.elements());
        };
        let reach = 0.5 * ends.start.distance(ends.end);
        assert_eq!(c1, Point::new(100.0 + reach, 30.0));
        assert_eq!(c2, Point::new(300.0 - reach, 230.0));
        assert_eq!(end, ends.end);
    }

    #[test]
    fn short_bezier_keeps_port_extension() {
        let (a, _, _) = pair();
        let b = Node::new("b", Rect::new(104.0, 0.0, 204.0, 60.0))
            .with_port(Port::input("in", PortSide::Left));
        let c = Connection::new("c", PortRef::new("a", "out"), PortRef::new("b", "in"));
        let style = ConnectionStyle::default();
        let ends = Endpoints::resolve(&c, &a, &b, &style).expect("valid endpoints");
        let path = style.build_path(&ends);
        let Some(PathEl::CurveTo(c1, _, _)) = path.elements().get(1).copied() else {
            panic!("expected a cubic");
        };
        assert_eq!(c1.x - ends.start.x, style.port_extension);
    }

    #[test]
    fn sharp_step_route_is_orthogonal() {
        let (a, b, c) = pair();
        let style = ConnectionStyle::default().with_kind(PathKind::Step { corner_radius: 0.0 });
        let ends = Endpoints::resolve(&c, &a, &b, &style).expect("valid endpoints");
        let path = style.build_path(&ends);
        let mut last = ends.start;
        for el in path.elements().iter().skip(1) {
            let PathEl::LineTo(p) = *el else {
                panic!("sharp corners only use lines, got {el:?}");
            };
            assert!(p.x == last.x || p.y == last.y, "diagonal leg {last:?} -> {p:?}");
            last = p;
        }
        assert_eq!(last, ends.end);
    }

    #[test]
    fn rounded_step_stays_inside_route_bounds() {
        let (a, b, c) = pair();
        let style = ConnectionStyle::default().with_kind(PathKind::Step { corner_radius: 1_000.0 });
        let ends = Endpoints::resolve(&c, &a, &b, &style).expect("valid endpoints");
        let path = style.build_path(&ends);
        let route = Rect::from_points(ends.start, ends.end).inflate(style.port_extension, 0.0);
        let bbox = path.bounding_box();
        assert!(route.union(bbox) == route, "{bbox:?} escapes {route:?}");
        assert!(path.elements().iter().any(|el| matches!(el, PathEl::QuadTo(..))));
    }

    #[test]
    fn wrong_endpoints_are_errors() {
        let (a, b, c) = pair();
        let style = ConnectionStyle::default();
        let swapped = Endpoints::resolve(&c, &b, &a, &style);
        assert!(matches!(swapped, Err(PathError::EndpointMismatch { .. })));

        let bare = Node::new("b", b.bounds);
        let missing = Endpoints::resolve(&c, &a, &bare, &style);
        assert_eq!(
            missing,
            Err(PathError::MissingPort {
                node: NodeId::from("b"),
                port: PortId::from("in"),
            })
        );
    }
}
