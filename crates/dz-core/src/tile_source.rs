//! Normalized tile-source descriptors.
//!
//! A [`TileSource`] is produced once by the resolver and never reshaped
//! afterwards; downstream stages match on the variant instead of sniffing
//! JSON fields.

use serde::{Deserialize, Serialize};

use crate::ImageSize;

/// IIIF `tiles` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct IiifTile {
    pub width: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub scale_factors: Vec<u32>,
}

/// IIIF `sizes` entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IiifSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TileSourceKind {
    IiifInfo,
    LegacyPyramid,
    SingleImage,
}

impl TileSourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IiifInfo => "IIIF_INFO",
            Self::LegacyPyramid => "LEGACY_PYRAMID",
            Self::SingleImage => "SINGLE_IMAGE",
        }
    }
}

/// A tiled IIIF Image-API source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IiifInfoSource {
    /// Base id (`@id` or `id`) without trailing slash.
    pub id: String,
    pub size: ImageSize,
    pub tiles: Vec<IiifTile>,
    pub sizes: Vec<IiifSize>,
}

/// One resolution tier of a legacy pyramid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PyramidLevel {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegacyPyramidSource {
    pub size: ImageSize,
    pub levels: Vec<PyramidLevel>,
}

/// A plain image the viewer tiles on its own.
///
/// The size is unknown until the viewer has opened the image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SingleImageSource {
    pub url: String,
    pub size: Option<ImageSize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileSource {
    IiifInfo(IiifInfoSource),
    LegacyPyramid(LegacyPyramidSource),
    SingleImage(SingleImageSource),
}

impl TileSource {
    #[must_use]
    pub const fn kind(&self) -> TileSourceKind {
        match self {
            Self::IiifInfo(_) => TileSourceKind::IiifInfo,
            Self::LegacyPyramid(_) => TileSourceKind::LegacyPyramid,
            Self::SingleImage(_) => TileSourceKind::SingleImage,
        }
    }

    /// Full-resolution size, if known.
    #[must_use]
    pub const fn size(&self) -> Option<ImageSize> {
        match self {
            Self::IiifInfo(source) => Some(source.size),
            Self::LegacyPyramid(source) => Some(source.size),
            Self::SingleImage(source) => source.size,
        }
    }

    /// Attach the size reported by the viewer to a single-image source.
    ///
    /// Sources that already carry their size are returned unchanged.
    #[must_use]
    pub fn with_size(self, size: ImageSize) -> Self {
        match self {
            Self::SingleImage(SingleImageSource { url, size: None }) => {
                Self::SingleImage(SingleImageSource {
                    url,
                    size: Some(size),
                })
            }
            other => other,
        }
    }
}
