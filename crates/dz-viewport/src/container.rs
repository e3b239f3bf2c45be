//! Viewer container abstraction.
//!
//! The measures engine reads the container size through [`Container`] so it
//! can run against a real DOM element or the in-memory [`BoxContainer`].

use dz_core::Size;

/// The element the viewer draws into.
pub trait Container {
    /// Size including border and padding.
    fn outer_size(&self) -> Size;

    /// Size of the content box.
    fn inner_size(&self) -> Size;

    /// Set the content-box height in pixels.
    fn set_height(&mut self, height: f64);
}

impl<T: Container + ?Sized> Container for &mut T {
    fn outer_size(&self) -> Size {
        (**self).outer_size()
    }

    fn inner_size(&self) -> Size {
        (**self).inner_size()
    }

    fn set_height(&mut self, height: f64) {
        (**self).set_height(height);
    }
}

/// Border plus padding on each side, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Insets {
    #[must_use]
    pub const fn uniform(width: f64) -> Self {
        Self {
            top: width,
            right: width,
            bottom: width,
            left: width,
        }
    }
}

/// In-memory container with a content box and insets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxContainer {
    inner: Size,
    insets: Insets,
    resize_count: usize,
}

impl BoxContainer {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            inner: Size::new(width, height),
            insets: Insets {
                top: 0.0,
                right: 0.0,
                bottom: 0.0,
                left: 0.0,
            },
            resize_count: 0,
        }
    }

    #[must_use]
    pub const fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    /// Simulate the browser resizing the element.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.inner = Size::new(width, height);
    }

    /// Number of `set_height` calls received.
    #[must_use]
    pub const fn resize_count(&self) -> usize {
        self.resize_count
    }
}

impl Container for BoxContainer {
    fn outer_size(&self) -> Size {
        Size::new(
            self.inner.x + self.insets.left + self.insets.right,
            self.inner.y + self.insets.top + self.insets.bottom,
        )
    }

    fn inner_size(&self) -> Size {
        self.inner
    }

    fn set_height(&mut self, height: f64) {
        self.inner.y = height.max(0.0);
        self.resize_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use dz_core::Size;

    use super::{BoxContainer, Container, Insets};

    #[test]
    fn outer_size_includes_insets() {
        let container = BoxContainer::new(800.0, 600.0).with_insets(Insets {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0,
        });
        assert_eq!(container.inner_size(), Size::new(800.0, 600.0));
        assert_eq!(container.outer_size(), Size::new(806.0, 604.0));
    }

    #[test]
    fn set_height_changes_content_box_only() {
        let mut container = BoxContainer::new(800.0, 600.0).with_insets(Insets::uniform(5.0));
        container.set_height(1000.0);
        assert_eq!(container.inner_size(), Size::new(800.0, 1000.0));
        assert_eq!(container.outer_size(), Size::new(810.0, 1010.0));
        assert_eq!(container.resize_count(), 1);
    }
}
