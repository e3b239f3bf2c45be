//! Display geometry of the image inside its container.
//!
//! [`ViewportMeasures`] is a snapshot: it is rebuilt from scratch on every
//! open, resize and rotate and never updated in place.

use dz_core::{ImageSize, InvalidImageSizeError, Size, ViewerConfig};
use serde::Serialize;
use tracing::debug;

use crate::Container;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitMode {
    FitToWidth,
    FitToHeight,
}

impl FitMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FitToWidth => "fit-to-width",
            Self::FitToHeight => "fit-to-height",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MeasureOptions {
    pub adapt_container_height: bool,
    pub footer_height: f64,
}

impl MeasureOptions {
    #[must_use]
    pub const fn from_config(config: &ViewerConfig) -> Self {
        Self {
            adapt_container_height: config.adapt_container_height,
            footer_height: config.footer_height,
        }
    }
}

/// Vertical padding handed to the viewer's viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ViewportMargins {
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportMeasures {
    pub outer_container_size: Size,
    pub inner_container_size: Size,
    /// Summed widths and maximum height of all loaded images.
    pub original_image_size: Size,
    pub footer_height: f64,
    pub rotation_degrees: f64,
    pub adapt_container_height: bool,
    pub fit_mode: FitMode,
    /// Drawn size in image orientation.
    pub image_display_size: Size,
    /// Drawn size in container orientation.
    pub rotated_image_display_size: Size,
}

/// Combined size of side-by-side images: summed widths, maximum height.
pub fn original_image_size(images: &[ImageSize]) -> Result<Size, InvalidImageSizeError> {
    if images.is_empty() {
        return Err(InvalidImageSizeError {
            width: 0.0,
            height: 0.0,
        });
    }
    let mut size = Size::default();
    for image in images {
        if image.width == 0 || image.height == 0 {
            return Err(InvalidImageSizeError {
                width: f64::from(image.width),
                height: f64::from(image.height),
            });
        }
        size.x += f64::from(image.width);
        size.y = size.y.max(f64::from(image.height));
    }
    Ok(size)
}

/// True for rotations that swap the axes.
#[must_use]
pub fn is_rotated(rotation_degrees: f64) -> bool {
    rotation_degrees % 180.0 != 0.0
}

/// Swap `size` when the rotation turns the image on its side.
#[must_use]
pub fn rotated_size(size: Size, rotation_degrees: f64) -> Size {
    if is_rotated(rotation_degrees) {
        size.swapped()
    } else {
        size
    }
}

impl ViewportMeasures {
    /// Measure `container` and lay out `images` inside it.
    pub fn compute<C: Container + ?Sized>(
        container: &C,
        images: &[ImageSize],
        options: MeasureOptions,
        rotation_degrees: f64,
    ) -> Result<Self, InvalidImageSizeError> {
        let original = original_image_size(images)?;
        Self::from_sizes(
            container.outer_size(),
            container.inner_size(),
            original,
            options,
            rotation_degrees,
        )
    }

    /// Pure core of [`Self::compute`].
    ///
    /// The inner container needs a positive finite width, and a positive
    /// height unless it adapts to the image; otherwise the container size is
    /// reported as the invalid display size.
    pub fn from_sizes(
        outer_container_size: Size,
        inner_container_size: Size,
        original_image_size: Size,
        options: MeasureOptions,
        rotation_degrees: f64,
    ) -> Result<Self, InvalidImageSizeError> {
        if !original_image_size.is_positive() {
            return Err(InvalidImageSizeError {
                width: original_image_size.x,
                height: original_image_size.y,
            });
        }
        let Size { x: width, y: height } = inner_container_size;
        let usable_height = if options.adapt_container_height {
            height >= 0.0
        } else {
            height > 0.0
        };
        if !(width.is_finite() && width > 0.0 && height.is_finite() && usable_height) {
            return Err(InvalidImageSizeError {
                width: inner_container_size.x,
                height: inner_container_size.y,
            });
        }

        let image_ratio = rotated_size(original_image_size, rotation_degrees).ratio();
        let fit_mode = if !options.adapt_container_height
            && image_ratio > inner_container_size.ratio()
        {
            FitMode::FitToHeight
        } else {
            FitMode::FitToWidth
        };

        let rotated_image_display_size = match fit_mode {
            FitMode::FitToHeight => {
                let y = inner_container_size.y;
                Size::new(y / image_ratio, y)
            }
            FitMode::FitToWidth => {
                let x = inner_container_size.x;
                Size::new(x, x * image_ratio)
            }
        };
        let image_display_size = rotated_size(rotated_image_display_size, rotation_degrees);

        let measures = Self {
            outer_container_size,
            inner_container_size,
            original_image_size,
            footer_height: options.footer_height,
            rotation_degrees,
            adapt_container_height: options.adapt_container_height,
            fit_mode,
            image_display_size,
            rotated_image_display_size,
        };
        debug!(
            "Measures: container {}x{}, image {}x{}, rotation {}, {}",
            inner_container_size.x,
            inner_container_size.y,
            original_image_size.x,
            original_image_size.y,
            rotation_degrees,
            fit_mode.as_str()
        );
        Ok(measures)
    }

    #[must_use]
    pub const fn options(&self) -> MeasureOptions {
        MeasureOptions {
            adapt_container_height: self.adapt_container_height,
            footer_height: self.footer_height,
        }
    }

    #[must_use]
    pub fn rotated(&self) -> bool {
        is_rotated(self.rotation_degrees)
    }

    #[must_use]
    pub fn get_rotated_size(&self, size: Size) -> Size {
        rotated_size(size, self.rotation_degrees)
    }

    #[must_use]
    pub fn fit_to_height(&self) -> bool {
        self.fit_mode == FitMode::FitToHeight
    }

    /// Half the vertical space left over below a fit-to-width image.
    ///
    /// Zero for adaptive containers and fit-to-height images.
    #[must_use]
    pub fn calculate_excess_height(&self) -> f64 {
        if self.adapt_container_height || self.fit_to_height() {
            return 0.0;
        }
        (0.5 * (self.inner_container_size.y - self.rotated_image_display_size.y)).max(0.0)
    }

    #[must_use]
    pub fn viewport_margins(&self) -> ViewportMargins {
        let excess = self.calculate_excess_height();
        ViewportMargins {
            top: excess,
            bottom: excess + self.footer_height,
        }
    }

    /// Viewer zoom at which the composite fills the container per fit mode.
    ///
    /// `world_size` is the composite's extent in viewport-normalized units;
    /// zoom 1 shows one unit across the container width.
    #[must_use]
    pub fn home_zoom(&self, world_size: Size) -> f64 {
        let across = self.get_rotated_size(world_size).x;
        self.rotated_image_display_size.x / (self.inner_container_size.x * across)
    }

    /// Grow an adaptive container to the image height plus footer and measure
    /// again.
    ///
    /// Returns the fresh measures; non-adaptive containers are left alone.
    pub fn resize_canvas<C: Container + ?Sized>(
        &self,
        container: &mut C,
    ) -> Result<Self, InvalidImageSizeError> {
        if self.adapt_container_height {
            let height = self.rotated_image_display_size.y + self.footer_height;
            debug!("Resizing container to {height}px");
            container.set_height(height);
        }
        Self::from_sizes(
            container.outer_size(),
            container.inner_size(),
            self.original_image_size,
            self.options(),
            self.rotation_degrees,
        )
    }
}

#[cfg(test)]
mod tests {
    use dz_core::{ImageSize, Size};
    use proptest::prelude::*;

    use super::{FitMode, MeasureOptions, ViewportMeasures, original_image_size, rotated_size};
    use crate::{BoxContainer, Container};

    const FIXED: MeasureOptions = MeasureOptions {
        adapt_container_height: false,
        footer_height: 0.0,
    };

    fn measure(
        container: Size,
        image: Size,
        options: MeasureOptions,
        rotation: f64,
    ) -> ViewportMeasures {
        ViewportMeasures::from_sizes(container, container, image, options, rotation)
            .expect("valid image size")
    }

    #[test]
    fn wide_image_fits_width_and_centers_vertically() {
        let measures = measure(Size::new(800.0, 600.0), Size::new(2000.0, 1000.0), FIXED, 0.0);
        assert_eq!(measures.fit_mode, FitMode::FitToWidth);
        assert_eq!(measures.image_display_size, Size::new(800.0, 400.0));
        assert_eq!(measures.calculate_excess_height(), 100.0);
    }

    #[test]
    fn tall_image_fits_height() {
        let measures = measure(Size::new(800.0, 600.0), Size::new(1000.0, 2000.0), FIXED, 0.0);
        assert_eq!(measures.fit_mode, FitMode::FitToHeight);
        assert_eq!(measures.image_display_size, Size::new(300.0, 600.0));
        assert_eq!(measures.calculate_excess_height(), 0.0);
    }

    #[test]
    fn rotation_swaps_the_binding_dimension() {
        // Wide image turned on its side becomes tall.
        let measures = measure(Size::new(800.0, 600.0), Size::new(2000.0, 1000.0), FIXED, 90.0);
        assert!(measures.rotated());
        assert_eq!(measures.fit_mode, FitMode::FitToHeight);
        assert_eq!(measures.rotated_image_display_size, Size::new(300.0, 600.0));
        assert_eq!(measures.image_display_size, Size::new(600.0, 300.0));
    }

    #[test]
    fn adaptive_container_always_fits_width() {
        let options = MeasureOptions {
            adapt_container_height: true,
            footer_height: 50.0,
        };
        let measures = measure(Size::new(800.0, 600.0), Size::new(1000.0, 2000.0), options, 0.0);
        assert_eq!(measures.fit_mode, FitMode::FitToWidth);
        assert_eq!(measures.image_display_size, Size::new(800.0, 1600.0));
        assert_eq!(measures.calculate_excess_height(), 0.0);
    }

    #[test]
    fn resize_canvas_grows_adaptive_container() {
        let mut container = BoxContainer::new(800.0, 600.0);
        let options = MeasureOptions {
            adapt_container_height: true,
            footer_height: 50.0,
        };
        let measures =
            ViewportMeasures::compute(&container, &[ImageSize::new(1000, 2000)], options, 0.0)
                .expect("valid image");

        let resized = measures.resize_canvas(&mut container).expect("still valid");
        assert_eq!(container.inner_size(), Size::new(800.0, 1650.0));
        assert_eq!(resized.inner_container_size, Size::new(800.0, 1650.0));
        assert_eq!(resized.image_display_size, measures.image_display_size);
        assert_eq!(resized.viewport_margins().bottom, 50.0);
    }

    #[test]
    fn resize_canvas_leaves_fixed_container_alone() {
        let mut container = BoxContainer::new(800.0, 600.0);
        let measures =
            ViewportMeasures::compute(&container, &[ImageSize::new(1000, 2000)], FIXED, 0.0)
                .expect("valid image");
        let resized = measures.resize_canvas(&mut container).expect("still valid");
        assert_eq!(container.resize_count(), 0);
        assert_eq!(resized, measures);
    }

    #[test]
    fn composite_sums_widths_and_takes_max_height() {
        let size = original_image_size(&[ImageSize::new(1000, 1500), ImageSize::new(900, 1400)])
            .expect("valid sizes");
        assert_eq!(size, Size::new(1900.0, 1500.0));
    }

    #[test]
    fn zero_sized_images_fail_fast() {
        assert!(original_image_size(&[]).is_err());
        assert!(original_image_size(&[ImageSize::new(0, 100)]).is_err());
        let result = ViewportMeasures::from_sizes(
            Size::new(800.0, 600.0),
            Size::new(800.0, 600.0),
            Size::new(100.0, f64::NAN),
            FIXED,
            0.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn degenerate_containers_are_rejected() {
        let image = Size::new(2000.0, 1000.0);
        for inner in [
            Size::new(0.0, 400.0),
            Size::new(-10.0, 400.0),
            Size::new(800.0, 0.0),
            Size::new(f64::INFINITY, 400.0),
        ] {
            let result = ViewportMeasures::from_sizes(inner, inner, image, FIXED, 0.0);
            assert!(result.is_err(), "{inner:?} accepted");
        }

        // An adaptive container may start out flat; it grows to the image.
        let adaptive = MeasureOptions {
            adapt_container_height: true,
            footer_height: 0.0,
        };
        let flat = Size::new(800.0, 0.0);
        let measures = ViewportMeasures::from_sizes(flat, flat, image, adaptive, 0.0)
            .expect("adaptive container");
        assert_eq!(measures.rotated_image_display_size, Size::new(800.0, 400.0));
    }

    #[test]
    fn home_zoom_is_one_when_width_fits() {
        let measures = measure(Size::new(800.0, 600.0), Size::new(2000.0, 1000.0), FIXED, 0.0);
        assert_eq!(measures.home_zoom(Size::new(1.0, 0.5)), 1.0);

        let tall = measure(Size::new(800.0, 600.0), Size::new(1000.0, 2000.0), FIXED, 0.0);
        assert_eq!(tall.home_zoom(Size::new(1.0, 2.0)), 300.0 / 800.0);
    }

    #[test]
    fn margins_add_footer_below_centered_image() {
        let options = MeasureOptions {
            adapt_container_height: false,
            footer_height: 20.0,
        };
        let measures = measure(Size::new(800.0, 600.0), Size::new(2000.0, 1000.0), options, 0.0);
        let margins = measures.viewport_margins();
        assert_eq!(margins.top, 100.0);
        assert_eq!(margins.bottom, 120.0);
    }

    fn size_strategy() -> impl Strategy<Value = Size> {
        (1.0f64..5000.0, 1.0f64..5000.0).prop_map(|(x, y)| Size::new(x, y))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_rotation_round_trips(size in size_strategy(), quarter in 0u8..4) {
            let rotation = f64::from(quarter) * 90.0;
            prop_assert_eq!(rotated_size(rotated_size(size, rotation), rotation), size);
        }

        #[test]
        fn prop_display_preserves_aspect_ratio(
            container in size_strategy(),
            image in size_strategy(),
            quarter in 0u8..4,
            adapt in any::<bool>(),
        ) {
            let rotation = f64::from(quarter) * 90.0;
            let options = MeasureOptions { adapt_container_height: adapt, footer_height: 0.0 };
            let measures = measure(container, image, options, rotation);

            let expected = rotated_size(image, rotation).ratio();
            let actual = measures.rotated_image_display_size.ratio();
            prop_assert!((actual - expected).abs() <= 1e-9 * expected.max(1.0));
            prop_assert!((measures.image_display_size.ratio() - image.ratio()).abs()
                <= 1e-9 * image.ratio().max(1.0));

            let fits_height = measures.fit_to_height();
            prop_assert_eq!(fits_height, measures.fit_mode == FitMode::FitToHeight);
            if fits_height {
                prop_assert_eq!(measures.rotated_image_display_size.y, container.y);
            } else {
                prop_assert_eq!(measures.rotated_image_display_size.x, container.x);
            }
        }

        #[test]
        fn prop_excess_height_is_never_negative(
            container in size_strategy(),
            image in size_strategy(),
            quarter in 0u8..4,
            adapt in any::<bool>(),
        ) {
            let rotation = f64::from(quarter) * 90.0;
            let options = MeasureOptions { adapt_container_height: adapt, footer_height: 0.0 };
            let measures = measure(container, image, options, rotation);
            let excess = measures.calculate_excess_height();
            prop_assert!(excess >= 0.0);
            if adapt || measures.fit_to_height() {
                prop_assert_eq!(excess, 0.0);
            }
        }
    }
}
