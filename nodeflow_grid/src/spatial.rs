// Copyright 2025 the Nodeflow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The minimal capability an indexable item needs, plus the shared box predicates.

use core::fmt::Debug;
use core::hash::Hash;

use kurbo::{Point, Rect};

/// Something with a stable key and an axis-aligned bounding box.
///
/// The grid never looks past this trait, so it has no knowledge of what the
/// key refers to. Items are expected to be small records; domain objects stay
/// with whoever owns them.
pub trait Spatial {
    /// Identifier used for membership and removal.
    type Key: Clone + Eq + Hash + Debug;

    /// The item's key.
    fn key(&self) -> Self::Key;

    /// The item's current bounding box.
    ///
    /// Called whenever the item is (re)indexed, so it must reflect the item's
    /// current geometry.
    fn bounds(&self) -> Rect;
}

/// Returns `true` if `rect` can be indexed: all edges finite and both extents positive.
#[inline]
pub fn is_indexable(rect: Rect) -> bool {
    rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite()
        && rect.width() > 0.0
        && rect.height() > 0.0
}

/// Strict overlap: the rectangles share interior area.
///
/// Rectangles that merely touch along an edge do not overlap.
#[inline]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Edge-inclusive containment of `pt` in `rect` grown by `radius` on every side.
#[inline]
pub fn contains_point(rect: Rect, pt: Point, radius: f64) -> bool {
    pt.x >= rect.x0 - radius
        && pt.x <= rect.x1 + radius
        && pt.y >= rect.y0 - radius
        && pt.y <= rect.y1 + radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_boxes_are_not_indexable() {
        assert!(is_indexable(Rect::new(0.0, 0.0, 1.0, 1.0)));
        assert!(!is_indexable(Rect::new(0.0, 0.0, 0.0, 1.0)), "zero width");
        assert!(!is_indexable(Rect::new(5.0, 0.0, 1.0, 1.0)), "negative width");
        assert!(!is_indexable(Rect::new(0.0, 0.0, f64::NAN, 1.0)), "NaN edge");
        assert!(
            !is_indexable(Rect::new(0.0, f64::NEG_INFINITY, 1.0, 1.0)),
            "infinite edge"
        );
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!overlaps(a, Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(overlaps(a, Rect::new(9.5, 9.5, 20.0, 20.0)));
    }

    #[test]
    fn containment_includes_edges_and_radius() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains_point(r, Point::new(10.0, 10.0), 0.0));
        assert!(!contains_point(r, Point::new(12.0, 5.0), 0.0));
        assert!(contains_point(r, Point::new(12.0, 5.0), 2.0));
    }
}
