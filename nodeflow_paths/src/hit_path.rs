// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point-in-stroke tests against a flattened path.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{BezPath, Line, ParamCurveNearest, PathEl, Point, Rect, Shape};

/// Flattening accuracy for hit paths, in canvas units.
pub const FLATTEN_TOLERANCE: f64 = 0.25;

/// A path flattened to lines, plus the distance from the centerline that
/// counts as a hit.
///
/// This does not model joins, caps, or variable width; the hit region is the
/// set of points within [`radius`](Self::radius) of any line.
#[derive(Clone, Debug, PartialEq)]
pub struct HitPath {
    lines: Vec<Line>,
    radius: f64,
    bounds: Rect,
}

impl HitPath {
    /// Flatten `path` and use `radius` as the hit distance.
    pub fn new(path: &BezPath, radius: f64) -> Self {
        let mut lines = Vec::new();
        let mut subpath_start: Option<Point> = None;
        let mut last: Option<Point> = None;
        kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                subpath_start = Some(p);
                last = Some(p);
            }
            PathEl::LineTo(p) => {
                if let Some(from) = last {
                    lines.push(Line::new(from, p));
                }
                last = Some(p);
            }
            PathEl::ClosePath => {
                if let (Some(from), Some(to)) = (last, subpath_start)
                    && from != to
                {
                    lines.push(Line::new(from, to));
                }
                last = subpath_start;
            }
            _ => {}
        });
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let bounds = union_bounds(&lines).map_or(Rect::ZERO, |r| r.inflate(radius, radius));
        Self {
            lines,
            radius,
            bounds,
        }
    }

    /// The flattened centerline.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Hit distance from the centerline.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Bounding box of the hit region.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Returns `true` if the path flattened to nothing.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Distance from `pt` to the centerline, or `None` for an empty path.
    pub fn distance(&self, pt: Point) -> Option<f64> {
        self.lines
            .iter()
            .map(|line| line.nearest(pt, 0.).distance_sq)
            .min_by(f64::total_cmp)
            .map(|d_sq| d_sq.sqrt())
    }

    /// Distance to the centerline if `pt` is within [`radius`](Self::radius) of it.
    pub fn hit(&self, pt: Point) -> Option<f64> {
        self.distance(pt).filter(|d| *d <= self.radius)
    }

    /// Returns `true` if `pt` is within [`radius`](Self::radius) of the centerline.
    pub fn contains(&self, pt: Point) -> bool {
        self.contains_within(pt, self.radius)
    }

    /// Returns `true` if `pt` is within `radius` of the centerline.
    pub fn contains_within(&self, pt: Point, radius: f64) -> bool {
        if radius <= self.radius && !contains_inclusive(self.bounds, pt) {
            return false;
        }
        let limit_sq = radius * radius;
        self.lines
            .iter()
            .any(|line| line.nearest(pt, 0.).distance_sq <= limit_sq)
    }

    /// One box per run of `lines_per_segment` consecutive lines, each grown by
    /// the hit radius.
    ///
    /// These are the boxes to hand to the scene index for a connection.
    pub fn segment_bounds(&self, lines_per_segment: usize) -> Vec<Rect> {
        self.lines
            .chunks(lines_per_segment.max(1))
            .filter_map(union_bounds)
            .map(|r| r.inflate(self.radius, self.radius))
            .collect()
    }
}

fn union_bounds(lines: &[Line]) -> Option<Rect> {
    lines
        .iter()
        .map(Shape::bounding_box)
        .reduce(|acc, r| acc.union(r))
}

fn contains_inclusive(rect: Rect, pt: Point) -> bool {
    pt.x >= rect.x0 && pt.x <= rect.x1 && pt.y >= rect.y0 && pt.y <= rect.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to((x0, y0));
        path.line_to((x1, y1));
        path
    }

    #[test]
    fn stroked_line_hit_and_miss() {
        let hit = HitPath::new(&segment(0.0, 0.0, 10.0, 0.0), 1.0);

        assert_eq!(hit.hit(Point::new(5.0, 0.0)), Some(0.0));
        assert_eq!(hit.hit(Point::new(5.0, 0.5)), Some(0.5));
        assert!(hit.hit(Point::new(5.0, 5.0)).is_none());
        // Past the end the distance is to the endpoint.
        assert!(hit.contains(Point::new(10.5, 0.5)));
        assert!(!hit.contains(Point::new(11.5, 0.0)));
    }

    #[test]
    fn wider_radius_reaches_outside_cached_bounds() {
        let hit = HitPath::new(&segment(0.0, 0.0, 10.0, 0.0), 1.0);
        let probe = Point::new(5.0, 4.0);
        assert!(!hit.contains(probe));
        assert!(hit.contains_within(probe, 4.0));
        assert!(!hit.contains_within(Point::new(5.0, 0.5), 0.25));
    }

    #[test]
    fn curves_flatten_into_many_lines() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.curve_to((100.0, 0.0), (0.0, 100.0), (100.0, 100.0));
        let hit = HitPath::new(&path, 2.0);
        assert!(hit.lines().len() > 4, "only {} lines", hit.lines().len());
        assert!(hit.contains(Point::new(50.0, 50.0)), "curve passes through its midpoint");
        assert!(!hit.contains(Point::new(90.0, 10.0)));
    }

    #[test]
    fn segment_boxes_cover_every_line() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        for i in 1..=10_u32 {
            path.line_to((f64::from(i) * 10.0, 0.0));
        }
        let hit = HitPath::new(&path, 3.0);
        let boxes = hit.segment_bounds(4);
        assert_eq!(boxes.len(), 3);
        assert_eq!(boxes[0], Rect::new(-3.0, -3.0, 43.0, 3.0));
        assert_eq!(boxes[2], Rect::new(77.0, -3.0, 103.0, 3.0));
        assert_eq!(hit.segment_bounds(0).len(), 10);
    }

    #[test]
    fn closed_paths_include_the_closing_edge() {
        let mut path = segment(0.0, 0.0, 10.0, 0.0);
        path.line_to((10.0, 10.0));
        path.close_path();
        let hit = HitPath::new(&path, 0.5);
        assert_eq!(hit.lines().len(), 3);
        assert!(hit.contains(Point::new(5.0, 5.0)), "diagonal closing edge");
    }

    #[test]
    fn empty_path_never_hits() {
        let hit = HitPath::new(&BezPath::new(), 5.0);
        assert!(hit.is_empty());
        assert!(hit.distance(Point::ZERO).is_none());
        assert!(!hit.contains(Point::ZERO));
        assert!(hit.segment_bounds(8).is_empty());
    }
}
