//! Zoom, pan and rotation controls.
//!
//! Zoom follows the viewer convention: at zoom `z` the container shows
//! `1 / z` viewport-normalized units across its width.

use dz_core::{Point, Rect, Size, ViewerConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::measures::{ViewportMeasures, rotated_size};

/// Multiplier applied by one zoom-in step.
pub const ZOOM_STEP: f64 = 1.2;

/// Current camera of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: Point,
    pub zoom: f64,
    pub rotation: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            center: Point::new(0.5, 0.5),
            zoom: 1.0,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    /// Multiple of the home zoom.
    pub min_zoom_level: f64,
    /// Multiple of the home zoom.
    pub max_zoom_level: f64,
    pub visibility_ratio: f64,
}

impl ZoomLimits {
    #[must_use]
    pub const fn from_config(config: &ViewerConfig) -> Self {
        Self {
            min_zoom_level: config.min_zoom_level,
            max_zoom_level: config.max_zoom_level,
            visibility_ratio: config.visibility_ratio,
        }
    }
}

/// Normalize any angle into `[0, 360)`.
#[must_use]
pub fn normalize_rotation(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    if normalized >= 360.0 { 0.0 } else { normalized }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    limits: ZoomLimits,
    home_zoom: f64,
    world: Rect,
    container_ratio: f64,
    state: ViewState,
}

impl Controls {
    #[must_use]
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            limits,
            home_zoom: 1.0,
            world: Rect::new(0.0, 0.0, 1.0, 1.0),
            container_ratio: 1.0,
            state: ViewState::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> ViewState {
        self.state
    }

    #[must_use]
    pub const fn home_zoom(&self) -> f64 {
        self.home_zoom
    }

    /// Lower zoom bound; inverted config limits are read in order.
    #[must_use]
    pub fn min_zoom(&self) -> f64 {
        let ZoomLimits {
            min_zoom_level,
            max_zoom_level,
            ..
        } = self.limits;
        min_zoom_level.min(max_zoom_level) * self.home_zoom
    }

    #[must_use]
    pub fn max_zoom(&self) -> f64 {
        let ZoomLimits {
            min_zoom_level,
            max_zoom_level,
            ..
        } = self.limits;
        min_zoom_level.max(max_zoom_level) * self.home_zoom
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        let (min, max) = (self.min_zoom(), self.max_zoom());
        if min.is_finite() && max.is_finite() && min <= max {
            zoom.clamp(min, max)
        } else {
            zoom
        }
    }

    /// Take the home position from fresh measures of `world`.
    ///
    /// The current zoom is re-clamped to the new limits and the rotation is
    /// taken from the measures.
    pub fn set_home(&mut self, measures: &ViewportMeasures, world: Rect) {
        self.world = world;
        let home_zoom = measures.home_zoom(world.size());
        if home_zoom.is_finite() && home_zoom > 0.0 {
            self.home_zoom = home_zoom;
        } else {
            warn!("Ignoring unusable home zoom {home_zoom}");
        }
        self.container_ratio = measures.inner_container_size.ratio();
        self.state.rotation = normalize_rotation(measures.rotation_degrees);
        self.set_zoom(self.state.zoom);
    }

    pub fn go_home(&mut self) {
        self.state.zoom = self.home_zoom;
        self.state.center = self.world.center();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if !(zoom.is_finite() && zoom > 0.0) {
            return;
        }
        self.state.zoom = self.clamp_zoom(zoom);
        self.constrain_center();
    }

    /// Zoom by `factor`, keeping `anchor` (default: the center) fixed on
    /// screen.
    pub fn zoom_by(&mut self, factor: f64, anchor: Option<Point>) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let old_zoom = self.state.zoom;
        self.state.zoom = self.clamp_zoom(old_zoom * factor);
        if let Some(anchor) = anchor {
            let keep = old_zoom / self.state.zoom;
            let center = self.state.center;
            self.state.center = Point::new(
                anchor.x + (center.x - anchor.x) * keep,
                anchor.y + (center.y - anchor.y) * keep,
            );
        }
        self.constrain_center();
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_STEP, None);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(1.0 / ZOOM_STEP, None);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.state.center = self.state.center.offset(dx, dy);
        self.constrain_center();
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.state.rotation = normalize_rotation(degrees);
        self.constrain_center();
    }

    pub fn rotate_right(&mut self) {
        self.set_rotation(self.state.rotation + 90.0);
    }

    pub fn rotate_left(&mut self) {
        self.set_rotation(self.state.rotation - 90.0);
    }

    /// Apply a stored camera, clamped to the current limits.
    pub fn restore(&mut self, state: ViewState) {
        self.state.center = state.center;
        self.state.rotation = normalize_rotation(state.rotation);
        self.set_zoom(state.zoom);
    }

    /// Extent of the visible area in viewport units, in world orientation.
    #[must_use]
    pub fn visible_size(&self) -> Size {
        let across = 1.0 / self.state.zoom;
        rotated_size(
            Size::new(across, across * self.container_ratio),
            self.state.rotation,
        )
    }

    /// Area currently on screen, in viewport units.
    #[must_use]
    pub fn visible_bounds(&self) -> Rect {
        let visible = self.visible_size();
        let center = self.state.center;
        Rect::new(
            center.x - visible.x / 2.0,
            center.y - visible.y / 2.0,
            visible.x,
            visible.y,
        )
    }

    /// Keep at least `visibility_ratio` of the image (or of the visible
    /// area, if smaller) on screen along each axis.
    fn constrain_center(&mut self) {
        let visible = self.visible_size();
        let ratio = self.limits.visibility_ratio;
        self.state.center.x = constrain_axis(
            self.state.center.x,
            self.world.x,
            self.world.right(),
            visible.x,
            ratio,
        );
        self.state.center.y = constrain_axis(
            self.state.center.y,
            self.world.y,
            self.world.bottom(),
            visible.y,
            ratio,
        );
    }
}

fn constrain_axis(center: f64, low: f64, high: f64, visible: f64, ratio: f64) -> f64 {
    if !visible.is_finite() {
        return center;
    }
    let half = visible / 2.0;
    let overlap = ratio * (high - low).min(visible);
    center.clamp(low + overlap - half, high - overlap + half)
}

#[cfg(test)]
mod tests {
    use dz_core::{Point, Rect, Size};

    use super::{Controls, ViewState, ZoomLimits, normalize_rotation};
    use crate::{MeasureOptions, ViewportMeasures};

    fn controls() -> Controls {
        let mut controls = Controls::new(ZoomLimits {
            min_zoom_level: 1.0,
            max_zoom_level: 4.0,
            visibility_ratio: 0.5,
        });
        let measures = ViewportMeasures::from_sizes(
            Size::new(800.0, 400.0),
            Size::new(800.0, 400.0),
            Size::new(2000.0, 1000.0),
            MeasureOptions::default(),
            0.0,
        )
        .expect("valid image");
        controls.set_home(&measures, Rect::new(0.0, 0.0, 1.0, 0.5));
        controls.go_home();
        controls
    }

    #[test]
    fn home_centers_the_world() {
        let controls = controls();
        assert_eq!(controls.state().zoom, 1.0);
        assert_eq!(controls.state().center, Point::new(0.5, 0.25));
        assert_eq!(controls.visible_bounds(), Rect::new(0.0, 0.0, 1.0, 0.5));
    }

    #[test]
    fn zoom_is_clamped_to_multiples_of_home() {
        let mut controls = controls();
        controls.zoom_by(10.0, None);
        assert_eq!(controls.state().zoom, 4.0);
        controls.zoom_out();
        assert!((controls.state().zoom - 4.0 / 1.2).abs() < 1e-12);
        controls.set_zoom(0.01);
        assert_eq!(controls.state().zoom, 1.0);
    }

    #[test]
    fn zoom_around_anchor_keeps_anchor_fixed() {
        let mut controls = controls();
        controls.zoom_by(2.0, Some(Point::new(0.75, 0.25)));
        let state = controls.state();
        assert_eq!(state.zoom, 2.0);
        assert!((state.center.x - 0.625).abs() < 1e-12);
        assert!((state.center.y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn panning_keeps_part_of_the_image_visible() {
        let mut controls = controls();
        controls.pan_by(100.0, 0.0);
        // Visible width is 1.0 at home; half of it must still overlap.
        assert!((controls.state().center.x - 1.0).abs() < 1e-12);
        controls.pan_by(-200.0, 0.0);
        assert!(controls.state().center.x.abs() < 1e-12);
    }

    #[test]
    fn rotation_steps_wrap_around() {
        let mut controls = controls();
        controls.rotate_left();
        assert_eq!(controls.state().rotation, 270.0);
        controls.rotate_right();
        controls.rotate_right();
        assert_eq!(controls.state().rotation, 90.0);
        assert_eq!(normalize_rotation(-450.0), 270.0);
        assert_eq!(normalize_rotation(720.0), 0.0);
    }

    #[test]
    fn inverted_limits_are_read_in_order() {
        let mut controls = Controls::new(ZoomLimits {
            min_zoom_level: 5.0,
            max_zoom_level: 2.0,
            visibility_ratio: 0.5,
        });
        assert_eq!(controls.min_zoom(), 2.0);
        assert_eq!(controls.max_zoom(), 5.0);
        controls.set_zoom(100.0);
        assert_eq!(controls.state().zoom, 5.0);
        controls.zoom_by(0.01, None);
        assert_eq!(controls.state().zoom, 2.0);
    }

    #[test]
    fn unusable_zoom_inputs_leave_the_camera_alone() {
        let mut controls = controls();
        controls.zoom_by(2.0, None);
        controls.set_zoom(f64::NAN);
        controls.zoom_by(0.0, None);
        controls.zoom_by(f64::INFINITY, Some(Point::new(0.0, 0.0)));
        assert_eq!(controls.state().zoom, 2.0);
    }

    #[test]
    fn restore_clamps_stored_zoom() {
        let mut controls = controls();
        controls.restore(ViewState {
            center: Point::new(0.5, 0.25),
            zoom: 100.0,
            rotation: 450.0,
        });
        assert_eq!(controls.state().zoom, 4.0);
        assert_eq!(controls.state().rotation, 90.0);
    }
}
