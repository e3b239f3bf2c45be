#![forbid(unsafe_code)]

//! Overlays drawn on top of the deep-zoom image.
//!
//! Geometry lives in viewport-normalized coordinates. [`OverlayEngine`] owns
//! the collection and converts from original-image pixels through the owning
//! sub-image's transform. The three drawers share the pure hit-test and drag
//! math in [`hit`].

mod drawer;
mod engine;
pub mod hit;

pub use drawer::{DrawState, LineDrawer, RectangleDrawer, TransformDrawer};
pub use engine::{
    ElementHandle, HostOp, NoRotation, Overlay, OverlayEngine, OverlayHost, OverlayKey,
    OverlayShape, RecordingHost, RedrawStats, RotationCompensation, SCALE_TO_ORIGINAL_SIZE,
};
pub use hit::{DEFAULT_HIT_TOLERANCE, HitArea};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("unknown overlay group `{name}`")]
    UnknownGroup { name: String },
    #[error("overlay group `{name}` is not interactive")]
    NotInteractive { name: String },
    #[error("image index {index} out of range ({count} images)")]
    UnknownImageIndex { index: usize, count: usize },
    #[error("overlay `{group}/{id}` already exists")]
    DuplicateOverlay { group: String, id: String },
    #[error("no overlay `{group}/{id}`")]
    UnknownOverlay { group: String, id: String },
}
