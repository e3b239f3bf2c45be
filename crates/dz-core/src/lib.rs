#![forbid(unsafe_code)]

//! Core types for the deep-zoom viewport engine: geometry values, tile-source
//! descriptors, viewer configuration and the error taxonomy.

mod config;
mod geometry;
mod tile_source;

pub use config::{
    ConfigError, OverlayGroup, ViewerConfig, ViewerConfigParse, parse_viewer_config_value,
};
pub use geometry::{ImageSize, Point, Rect, Size};
pub use tile_source::{
    IiifInfoSource, IiifSize, IiifTile, LegacyPyramidSource, PyramidLevel, SingleImageSource,
    TileSource, TileSourceKind,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ViewerErrorCode {
    Resolution,
    EmptyLayout,
    UnknownImageSize,
    InvalidImageSize,
}

impl ViewerErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolution => "viewer/error/resolution",
            Self::EmptyLayout => "viewer/error/empty-layout",
            Self::UnknownImageSize => "viewer/error/unknown-image-size",
            Self::InvalidImageSize => "viewer/error/invalid-image-size",
        }
    }
}

/// A tile-source reference could not be turned into a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("reference is neither a URI nor JSON: {reference}")]
    Unrecognized { reference: String },
    #[error("not a JSON URI: {uri}")]
    NotJsonUri { uri: String },
    #[error("failed to fetch {uri}: {message}")]
    Fetch { uri: String, message: String },
    #[error("fetching {uri} timed out after {timeout_secs}s")]
    Timeout { uri: String, timeout_secs: u64 },
    #[error("invalid image information: {message}")]
    InvalidInfo { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no tile sources to lay out")]
    Empty,
    #[error("tile source {index} has no known image size")]
    UnknownImageSize { index: usize },
}

/// Zero, negative or non-finite image dimensions reached the geometry code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Error, PartialEq)]
#[error("invalid image size {width}x{height}")]
pub struct InvalidImageSizeError {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq)]
pub enum ViewerError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    InvalidImageSize(#[from] InvalidImageSizeError),
}

impl ViewerError {
    #[must_use]
    pub const fn code(&self) -> ViewerErrorCode {
        match self {
            Self::Resolution(_) => ViewerErrorCode::Resolution,
            Self::Layout(LayoutError::Empty) => ViewerErrorCode::EmptyLayout,
            Self::Layout(LayoutError::UnknownImageSize { .. }) => {
                ViewerErrorCode::UnknownImageSize
            }
            Self::InvalidImageSize(_) => ViewerErrorCode::InvalidImageSize,
        }
    }
}
