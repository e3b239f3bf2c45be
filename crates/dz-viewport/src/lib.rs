#![forbid(unsafe_code)]

//! Viewport geometry for the deep-zoom viewer.
//!
//! [`ViewportMeasures`] turns a container and the image sizes into display
//! sizes, margins and the home zoom. [`Controls`] owns the camera.

mod container;
mod measures;
mod viewport;

pub use container::{BoxContainer, Container, Insets};
pub use measures::{
    FitMode, MeasureOptions, ViewportMargins, ViewportMeasures, is_rotated, original_image_size,
    rotated_size,
};
pub use viewport::{Controls, ViewState, ZOOM_STEP, ZoomLimits, normalize_rotation};
