//! Hit areas and drag math shared by every interaction mode.
//!
//! All functions are pure and work in viewport-normalized units.

use dz_core::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Default pointer tolerance in viewport-normalized units.
pub const DEFAULT_HIT_TOLERANCE: f64 = 0.004;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HitArea {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

impl HitArea {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "TOPLEFT",
            Self::TopRight => "TOPRIGHT",
            Self::BottomLeft => "BOTTOMLEFT",
            Self::BottomRight => "BOTTOMRIGHT",
            Self::Top => "TOP",
            Self::Bottom => "BOTTOM",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Center => "CENTER",
        }
    }

    #[must_use]
    pub const fn is_corner(self) -> bool {
        matches!(
            self,
            Self::TopLeft | Self::TopRight | Self::BottomLeft | Self::BottomRight
        )
    }

    #[must_use]
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::Top | Self::Bottom | Self::Left | Self::Right)
    }
}

/// Distance from `point` to the segment `a`-`b`.
#[must_use]
pub fn point_segment_distance(point: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = b.delta(a);
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return point.distance(a);
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / length_squared).clamp(0.0, 1.0);
    point.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

fn nearest(candidates: [(HitArea, f64); 4], tolerance: f64) -> Option<HitArea> {
    candidates
        .into_iter()
        .min_by(|left, right| left.1.total_cmp(&right.1))
        .filter(|(_, distance)| *distance <= tolerance)
        .map(|(area, _)| area)
}

/// Closest corner of `rect` within `tolerance` of `point`.
#[must_use]
pub fn hit_corner(rect: Rect, point: Point, tolerance: f64) -> Option<HitArea> {
    nearest(
        [
            (HitArea::TopLeft, point.distance(rect.top_left())),
            (HitArea::TopRight, point.distance(rect.top_right())),
            (HitArea::BottomLeft, point.distance(rect.bottom_left())),
            (HitArea::BottomRight, point.distance(rect.bottom_right())),
        ],
        tolerance,
    )
}

/// Closest side of `rect` within `tolerance` of `point`.
#[must_use]
pub fn hit_edge(rect: Rect, point: Point, tolerance: f64) -> Option<HitArea> {
    let (tl, tr, bl, br) = (
        rect.top_left(),
        rect.top_right(),
        rect.bottom_left(),
        rect.bottom_right(),
    );
    nearest(
        [
            (HitArea::Top, point_segment_distance(point, tl, tr)),
            (HitArea::Bottom, point_segment_distance(point, bl, br)),
            (HitArea::Left, point_segment_distance(point, tl, bl)),
            (HitArea::Right, point_segment_distance(point, tr, br)),
        ],
        tolerance,
    )
}

/// Classify a pointer position against `rect`.
///
/// Corners are tried before edges, edges before the interior.
#[must_use]
pub fn hit_test(rect: Rect, point: Point, tolerance: f64) -> Option<HitArea> {
    hit_corner(rect, point, tolerance)
        .or_else(|| hit_edge(rect, point, tolerance))
        .or_else(|| rect.contains(point).then_some(HitArea::Center))
}

/// Move the side(s) named by `area` to `pointer`.
///
/// The opposite side stays fixed and the moving side stops at it, so the
/// result never has a negative width or height. `Center` leaves the
/// rectangle unchanged; use [`translate_rect`] for moves.
#[must_use]
pub fn drag_rect(rect: Rect, area: HitArea, pointer: Point) -> Rect {
    let (mut left, mut top, mut right, mut bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    let moves_left = matches!(area, HitArea::TopLeft | HitArea::BottomLeft | HitArea::Left);
    let moves_right = matches!(
        area,
        HitArea::TopRight | HitArea::BottomRight | HitArea::Right
    );
    let moves_top = matches!(area, HitArea::TopLeft | HitArea::TopRight | HitArea::Top);
    let moves_bottom = matches!(
        area,
        HitArea::BottomLeft | HitArea::BottomRight | HitArea::Bottom
    );

    if moves_left {
        left = pointer.x.min(right);
    }
    if moves_right {
        right = pointer.x.max(left);
    }
    if moves_top {
        top = pointer.y.min(bottom);
    }
    if moves_bottom {
        bottom = pointer.y.max(top);
    }
    Rect::new(left, top, right - left, bottom - top)
}

/// Shift `rect` by the pointer movement from `from` to `to`.
#[must_use]
pub fn translate_rect(rect: Rect, from: Point, to: Point) -> Rect {
    let (dx, dy) = to.delta(from);
    rect.translate(dx, dy)
}

#[cfg(test)]
mod tests {
    use dz_core::{Point, Rect};
    use proptest::prelude::*;

    use super::{
        HitArea, drag_rect, hit_corner, hit_edge, hit_test, point_segment_distance,
        translate_rect,
    };

    const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    #[test]
    fn corner_wins_over_adjacent_edge() {
        let point = Point::new(0.005, 0.0);
        assert_eq!(hit_edge(UNIT, point, 0.01), Some(HitArea::Top));
        assert_eq!(hit_test(UNIT, point, 0.01), Some(HitArea::TopLeft));
    }

    #[test]
    fn classifies_edges_interior_and_misses() {
        assert_eq!(
            hit_test(UNIT, Point::new(0.5, 1.003), 0.004),
            Some(HitArea::Bottom)
        );
        assert_eq!(
            hit_test(UNIT, Point::new(0.998, 0.5), 0.004),
            Some(HitArea::Right)
        );
        assert_eq!(
            hit_test(UNIT, Point::new(0.5, 0.5), 0.004),
            Some(HitArea::Center)
        );
        assert_eq!(hit_test(UNIT, Point::new(1.5, 0.5), 0.004), None);
    }

    #[test]
    fn nearest_corner_is_chosen() {
        let tiny = Rect::new(0.0, 0.0, 0.004, 0.004);
        assert_eq!(
            hit_corner(tiny, Point::new(0.003, 0.0035), 0.01),
            Some(HitArea::BottomRight)
        );
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        assert_eq!(point_segment_distance(Point::new(0.5, 0.25), a, b), 0.25);
        assert_eq!(point_segment_distance(Point::new(2.0, 0.0), a, b), 1.0);
        assert_eq!(point_segment_distance(Point::new(0.0, 3.0), a, a), 3.0);
    }

    #[test]
    fn dragging_top_left_past_bottom_right_collapses() {
        let rect = Rect::new(0.25, 0.25, 0.5, 0.5);
        let dragged = drag_rect(rect, HitArea::TopLeft, Point::new(2.0, 2.0));
        assert_eq!(dragged, Rect::new(0.75, 0.75, 0.0, 0.0));
    }

    #[test]
    fn edge_drag_moves_one_side() {
        let rect = Rect::new(0.25, 0.25, 0.5, 0.5);
        assert_eq!(
            drag_rect(rect, HitArea::Right, Point::new(1.0, 0.0)),
            Rect::new(0.25, 0.25, 0.75, 0.5)
        );
        assert_eq!(
            drag_rect(rect, HitArea::Top, Point::new(0.9, 0.0)),
            Rect::new(0.25, 0.0, 0.5, 0.75)
        );
        assert_eq!(drag_rect(rect, HitArea::Center, Point::new(9.0, 9.0)), rect);
    }

    #[test]
    fn translate_follows_pointer_delta() {
        let rect = Rect::new(0.0, 0.0, 0.5, 0.5);
        let moved = translate_rect(rect, Point::new(0.25, 0.25), Point::new(0.5, 0.75));
        assert_eq!(moved, Rect::new(0.25, 0.5, 0.5, 0.5));
    }

    fn any_area() -> impl Strategy<Value = HitArea> {
        prop_oneof![
            Just(HitArea::TopLeft),
            Just(HitArea::TopRight),
            Just(HitArea::BottomLeft),
            Just(HitArea::BottomRight),
            Just(HitArea::Top),
            Just(HitArea::Bottom),
            Just(HitArea::Left),
            Just(HitArea::Right),
            Just(HitArea::Center),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_drag_never_inverts(
            x in -2.0f64..2.0,
            y in -2.0f64..2.0,
            width in 0.0f64..2.0,
            height in 0.0f64..2.0,
            px in -5.0f64..5.0,
            py in -5.0f64..5.0,
            area in any_area(),
        ) {
            let dragged = drag_rect(Rect::new(x, y, width, height), area, Point::new(px, py));
            prop_assert!(dragged.width >= 0.0);
            prop_assert!(dragged.height >= 0.0);
        }

        #[test]
        fn prop_corner_hit_beats_edge_hit(
            px in -0.02f64..0.02,
            py in -0.02f64..0.02,
        ) {
            let point = Point::new(px, py);
            if hit_corner(UNIT, point, 0.01).is_some() {
                prop_assert_eq!(hit_test(UNIT, point, 0.01), Some(HitArea::TopLeft));
            }
        }
    }
}
