#![forbid(unsafe_code)]

//! Multi-image layout.
//!
//! Images of a composite (for example a double-page spread) sit in one row,
//! left to right in input order. Widths are normalized against the smallest
//! aspect ratio (height / width) in the set, so that image gets width 1.

use dz_core::{ImageSize, LayoutError, Point, Rect, TileSource};
use serde::Serialize;
use tracing::debug;

/// Position of one image inside the composite.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSlot {
    pub tile_source: TileSource,
    pub relative_width: f64,
    pub x: f64,
    /// Always 0; only single-row layouts exist.
    pub y: f64,
}

impl LayoutSlot {
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LayoutStats {
    pub image_count: usize,
    pub min_aspect_ratio: f64,
    pub total_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeLayout {
    pub slots: Vec<LayoutSlot>,
    pub stats: LayoutStats,
}

/// Lay out tile sources left to right.
pub fn layout(descriptors: Vec<TileSource>) -> Result<Vec<LayoutSlot>, LayoutError> {
    layout_composite(descriptors).map(|composite| composite.slots)
}

/// [`layout`] plus summary statistics.
pub fn layout_composite(descriptors: Vec<TileSource>) -> Result<CompositeLayout, LayoutError> {
    if descriptors.is_empty() {
        return Err(LayoutError::Empty);
    }

    if descriptors.len() == 1 {
        let min_aspect_ratio = descriptors[0]
            .size()
            .map_or(1.0, ImageSize::aspect_ratio);
        let slots = descriptors
            .into_iter()
            .map(|tile_source| LayoutSlot {
                tile_source,
                relative_width: 1.0,
                x: 0.0,
                y: 0.0,
            })
            .collect();
        return Ok(CompositeLayout {
            slots,
            stats: LayoutStats {
                image_count: 1,
                min_aspect_ratio,
                total_width: 1.0,
            },
        });
    }

    let mut ratios = Vec::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.iter().enumerate() {
        let size = descriptor
            .size()
            .ok_or(LayoutError::UnknownImageSize { index })?;
        ratios.push(size.aspect_ratio());
    }
    let min_aspect_ratio = ratios.iter().copied().fold(f64::INFINITY, f64::min);

    let mut x = 0.0;
    let mut slots = Vec::with_capacity(descriptors.len());
    for (tile_source, ratio) in descriptors.into_iter().zip(ratios) {
        let relative_width = ratio / min_aspect_ratio;
        slots.push(LayoutSlot {
            tile_source,
            relative_width,
            x,
            y: 0.0,
        });
        x += relative_width;
    }

    debug!(
        "Laid out {} images, min aspect ratio {min_aspect_ratio:.4}, total width {x:.4}",
        slots.len()
    );

    Ok(CompositeLayout {
        stats: LayoutStats {
            image_count: slots.len(),
            min_aspect_ratio,
            total_width: x,
        },
        slots,
    })
}

/// Image-pixel to viewport transform of one sub-image.
///
/// The image keeps its own aspect ratio inside its slot: the slot's
/// `relative_width` spans the image width and the height follows from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TiledImageTransform {
    pub origin: Point,
    pub width: f64,
    pub image: ImageSize,
}

impl TiledImageTransform {
    #[must_use]
    pub const fn new(origin: Point, width: f64, image: ImageSize) -> Self {
        Self {
            origin,
            width,
            image,
        }
    }

    /// Transform of a single image filling the unit width.
    #[must_use]
    pub const fn unit(image: ImageSize) -> Self {
        Self::new(Point::new(0.0, 0.0), 1.0, image)
    }

    /// Viewport units per image pixel.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.width / f64::from(self.image.width)
    }

    #[must_use]
    pub fn image_to_viewport(&self, point: Point) -> Point {
        let scale = self.scale();
        Point::new(
            self.origin.x + point.x * scale,
            self.origin.y + point.y * scale,
        )
    }

    #[must_use]
    pub fn viewport_to_image(&self, point: Point) -> Point {
        let scale = self.scale();
        Point::new(
            (point.x - self.origin.x) / scale,
            (point.y - self.origin.y) / scale,
        )
    }

    #[must_use]
    pub fn image_to_viewport_rect(&self, rect: Rect) -> Rect {
        let scale = self.scale();
        let origin = self.image_to_viewport(rect.top_left());
        Rect::new(origin.x, origin.y, rect.width * scale, rect.height * scale)
    }

    #[must_use]
    pub fn viewport_to_image_rect(&self, rect: Rect) -> Rect {
        let scale = self.scale();
        let origin = self.viewport_to_image(rect.top_left());
        Rect::new(origin.x, origin.y, rect.width / scale, rect.height / scale)
    }

    /// Area covered by the image in viewport coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.origin.x,
            self.origin.y,
            self.width,
            self.width * self.image.aspect_ratio(),
        )
    }
}

/// Per-slot transforms; every slot must know its image size.
pub fn image_transforms(slots: &[LayoutSlot]) -> Result<Vec<TiledImageTransform>, LayoutError> {
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let image = slot
                .tile_source
                .size()
                .ok_or(LayoutError::UnknownImageSize { index })?;
            Ok(TiledImageTransform::new(
                slot.origin(),
                slot.relative_width,
                image,
            ))
        })
        .collect()
}

/// Bounding rectangle of the whole composite in viewport coordinates.
#[must_use]
pub fn composite_bounds(transforms: &[TiledImageTransform]) -> Option<Rect> {
    transforms
        .iter()
        .map(TiledImageTransform::bounds)
        .reduce(Rect::union)
}

/// Index of the sub-image containing `point`, if any.
#[must_use]
pub fn image_index_at(transforms: &[TiledImageTransform], point: Point) -> Option<usize> {
    transforms
        .iter()
        .position(|transform| transform.bounds().contains(point))
}
