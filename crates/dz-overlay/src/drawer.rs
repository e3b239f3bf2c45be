//! Pointer-driven drawing modes.
//!
//! Every drawer runs the same state machine: `Idle` until a session starts,
//! `Armed` while waiting for a pointer press, `Dragging` between press and
//! release. Geometry comes from [`crate::hit`].

use dz_core::{Point, Rect};
use serde::Serialize;
use tracing::debug;

use crate::hit::{self, HitArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum DrawState {
    #[default]
    Idle,
    Armed,
    Dragging {
        area: HitArea,
    },
}

impl DrawState {
    #[must_use]
    pub const fn is_dragging(self) -> bool {
        matches!(self, Self::Dragging { .. })
    }
}

/// Draws a new rectangle from the press point to the pointer.
#[derive(Debug, Clone, Default)]
pub struct RectangleDrawer {
    state: DrawState,
    anchor: Point,
    rect: Option<Rect>,
}

impl RectangleDrawer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> DrawState {
        self.state
    }

    #[must_use]
    pub const fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn start_drawing(&mut self) {
        self.state = DrawState::Armed;
        self.rect = None;
    }

    /// Leave the drawing session, returning the last rectangle drawn.
    pub fn end_drawing(&mut self) -> Option<Rect> {
        self.state = DrawState::Idle;
        self.rect.take()
    }

    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.state != DrawState::Armed {
            return false;
        }
        self.anchor = point;
        self.rect = Some(Rect::new(point.x, point.y, 0.0, 0.0));
        self.state = DrawState::Dragging {
            area: HitArea::BottomRight,
        };
        true
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<Rect> {
        if !self.state.is_dragging() {
            return None;
        }
        self.rect = Some(Rect::from_points(self.anchor, point));
        self.rect
    }

    /// Finish the drag; the drawer re-arms for another rectangle.
    pub fn pointer_up(&mut self, point: Point) -> Option<Rect> {
        let rect = self.pointer_move(point)?;
        self.state = DrawState::Armed;
        debug!(
            "Rectangle drawn at ({:.4}, {:.4}) size {:.4}x{:.4}",
            rect.x, rect.y, rect.width, rect.height
        );
        Some(rect)
    }
}

/// Draws a straight line from the press point to the pointer.
#[derive(Debug, Clone, Default)]
pub struct LineDrawer {
    state: DrawState,
    line: Option<(Point, Point)>,
}

impl LineDrawer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> DrawState {
        self.state
    }

    pub fn start_drawing(&mut self) {
        self.state = DrawState::Armed;
        self.line = None;
    }

    pub fn end_drawing(&mut self) -> Option<(Point, Point)> {
        self.state = DrawState::Idle;
        self.line.take()
    }

    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.state != DrawState::Armed {
            return false;
        }
        self.line = Some((point, point));
        self.state = DrawState::Dragging {
            area: HitArea::BottomRight,
        };
        true
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<(Point, Point)> {
        if !self.state.is_dragging() {
            return None;
        }
        let (start, _) = self.line?;
        self.line = Some((start, point));
        self.line
    }

    pub fn pointer_up(&mut self, point: Point) -> Option<(Point, Point)> {
        let line = self.pointer_move(point)?;
        self.state = DrawState::Armed;
        Some(line)
    }
}

/// Resizes or moves an existing rectangle.
#[derive(Debug, Clone)]
pub struct TransformDrawer {
    state: DrawState,
    rect: Rect,
    last_pointer: Point,
    tolerance: f64,
}

impl TransformDrawer {
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            state: DrawState::Idle,
            rect: Rect::default(),
            last_pointer: Point::default(),
            tolerance,
        }
    }

    #[must_use]
    pub const fn state(&self) -> DrawState {
        self.state
    }

    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    pub fn start_drawing(&mut self, rect: Rect) {
        self.rect = rect;
        self.state = DrawState::Armed;
    }

    pub fn end_drawing(&mut self) -> Option<Rect> {
        let was_active = self.state != DrawState::Idle;
        self.state = DrawState::Idle;
        was_active.then_some(self.rect)
    }

    /// Classify the press; a miss leaves the drawer armed.
    pub fn pointer_down(&mut self, point: Point) -> Option<HitArea> {
        if self.state != DrawState::Armed {
            return None;
        }
        let area = hit::hit_test(self.rect, point, self.tolerance)?;
        self.state = DrawState::Dragging { area };
        self.last_pointer = point;
        Some(area)
    }

    pub fn pointer_move(&mut self, point: Point) -> Option<Rect> {
        let DrawState::Dragging { area } = self.state else {
            return None;
        };
        self.rect = if area == HitArea::Center {
            hit::translate_rect(self.rect, self.last_pointer, point)
        } else {
            hit::drag_rect(self.rect, area, point)
        };
        self.last_pointer = point;
        Some(self.rect)
    }

    pub fn pointer_up(&mut self, point: Point) -> Option<Rect> {
        let rect = self.pointer_move(point)?;
        self.state = DrawState::Armed;
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use dz_core::{Point, Rect};

    use super::{DrawState, LineDrawer, RectangleDrawer, TransformDrawer};
    use crate::HitArea;

    #[test]
    fn rectangle_drawer_follows_the_state_machine() {
        let mut drawer = RectangleDrawer::new();
        assert!(!drawer.pointer_down(Point::new(0.1, 0.1)));
        assert_eq!(drawer.state(), DrawState::Idle);

        drawer.start_drawing();
        assert!(drawer.pointer_down(Point::new(0.5, 0.5)));
        assert!(drawer.state().is_dragging());
        assert_eq!(
            drawer.pointer_move(Point::new(0.25, 0.75)),
            Some(Rect::new(0.25, 0.5, 0.25, 0.25))
        );
        assert_eq!(
            drawer.pointer_up(Point::new(0.75, 0.75)),
            Some(Rect::new(0.5, 0.5, 0.25, 0.25))
        );
        assert_eq!(drawer.state(), DrawState::Armed);
        assert_eq!(drawer.end_drawing(), Some(Rect::new(0.5, 0.5, 0.25, 0.25)));
        assert_eq!(drawer.state(), DrawState::Idle);
    }

    #[test]
    fn line_drawer_keeps_its_start_point() {
        let mut drawer = LineDrawer::new();
        drawer.start_drawing();
        drawer.pointer_down(Point::new(0.1, 0.2));
        drawer.pointer_move(Point::new(0.3, 0.3));
        let line = drawer.pointer_up(Point::new(0.5, 0.25));
        assert_eq!(line, Some((Point::new(0.1, 0.2), Point::new(0.5, 0.25))));
        assert_eq!(drawer.pointer_move(Point::new(0.9, 0.9)), None);
    }

    #[test]
    fn transform_miss_stays_armed() {
        let mut drawer = TransformDrawer::new(0.01);
        drawer.start_drawing(Rect::new(0.25, 0.25, 0.5, 0.5));
        assert_eq!(drawer.pointer_down(Point::new(0.9, 0.9)), None);
        assert_eq!(drawer.state(), DrawState::Armed);
        assert_eq!(drawer.pointer_move(Point::new(0.5, 0.5)), None);
    }

    #[test]
    fn transform_corner_drag_clamps_at_opposite_corner() {
        let mut drawer = TransformDrawer::new(0.01);
        drawer.start_drawing(Rect::new(0.25, 0.25, 0.5, 0.5));
        assert_eq!(
            drawer.pointer_down(Point::new(0.25, 0.25)),
            Some(HitArea::TopLeft)
        );
        let rect = drawer
            .pointer_up(Point::new(1.0, 1.0))
            .expect("dragging");
        assert_eq!(rect, Rect::new(0.75, 0.75, 0.0, 0.0));
        assert_eq!(drawer.state(), DrawState::Armed);
    }

    #[test]
    fn center_drag_accumulates_small_moves() {
        let mut drawer = TransformDrawer::new(0.01);
        drawer.start_drawing(Rect::new(0.0, 0.0, 0.5, 0.5));
        assert_eq!(
            drawer.pointer_down(Point::new(0.25, 0.25)),
            Some(HitArea::Center)
        );
        drawer.pointer_move(Point::new(0.375, 0.25));
        drawer.pointer_move(Point::new(0.5, 0.25));
        let rect = drawer
            .pointer_up(Point::new(0.5, 0.5))
            .expect("dragging");
        assert_eq!(rect, Rect::new(0.25, 0.25, 0.5, 0.5));
        assert_eq!(drawer.end_drawing(), Some(rect));
        assert_eq!(drawer.end_drawing(), None);
    }
}
