//! Overlay collection and its coordinate conversion.

use dz_core::{OverlayGroup, Point, Rect, ViewerConfig};
use dz_layout::TiledImageTransform;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::OverlayError;
use crate::hit::{self, HitArea};

/// Divisor applied to image-space coordinates before conversion. Editing at
/// a reduced resolution would change it.
pub const SCALE_TO_ORIGINAL_SIZE: f64 = 1.0;

/// Hook for correcting overlay points under rotation.
///
/// The viewer's own transform already contains the current rotation, so the
/// shipped implementation returns the point unchanged.
pub trait RotationCompensation {
    fn get_rotated(&self, point: Point, rotation_degrees: f64) -> Point;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRotation;

impl RotationCompensation for NoRotation {
    fn get_rotated(&self, point: Point, _rotation_degrees: f64) -> Point {
        point
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayKey {
    pub group: String,
    pub id: String,
}

impl OverlayKey {
    #[must_use]
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum OverlayShape {
    Rectangle(Rect),
    Line { start: Point, end: Point },
}

impl OverlayShape {
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match *self {
            Self::Rectangle(rect) => rect,
            Self::Line { start, end } => Rect::from_points(start, end),
        }
    }

    fn map_points(self, mut f: impl FnMut(Point) -> Point) -> Self {
        match self {
            Self::Rectangle(rect) => {
                Self::Rectangle(Rect::from_points(f(rect.top_left()), f(rect.bottom_right())))
            }
            Self::Line { start, end } => Self::Line {
                start: f(start),
                end: f(end),
            },
        }
    }
}

/// Opaque reference to an element attached to the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub key: OverlayKey,
    /// Viewport-normalized geometry.
    pub shape: OverlayShape,
    pub title: Option<String>,
    /// Sub-image the overlay belongs to.
    pub image_index: usize,
    pub hidden: bool,
    /// Present only while attached to the host.
    pub element: Option<ElementHandle>,
}

/// The viewer's overlay surface.
pub trait OverlayHost {
    fn add_overlay(
        &mut self,
        element: ElementHandle,
        location: Rect,
        index: usize,
        style_class: &str,
    );
    fn update_overlay(&mut self, element: ElementHandle, location: Rect);
    fn remove_overlay(&mut self, element: ElementHandle);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum HostOp {
    Add {
        element: ElementHandle,
        location: Rect,
        index: usize,
        style_class: String,
    },
    Update {
        element: ElementHandle,
        location: Rect,
    },
    Remove {
        element: ElementHandle,
    },
}

/// In-memory host that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    attached: FxHashMap<ElementHandle, Rect>,
    ops: Vec<HostOp>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_attached(&self, element: ElementHandle) -> bool {
        self.attached.contains_key(&element)
    }

    #[must_use]
    pub fn location(&self, element: ElementHandle) -> Option<Rect> {
        self.attached.get(&element).copied()
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    #[must_use]
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }
}

impl OverlayHost for RecordingHost {
    fn add_overlay(
        &mut self,
        element: ElementHandle,
        location: Rect,
        index: usize,
        style_class: &str,
    ) {
        self.attached.insert(element, location);
        self.ops.push(HostOp::Add {
            element,
            location,
            index,
            style_class: style_class.to_string(),
        });
    }

    fn update_overlay(&mut self, element: ElementHandle, location: Rect) {
        self.attached.insert(element, location);
        self.ops.push(HostOp::Update { element, location });
    }

    fn remove_overlay(&mut self, element: ElementHandle) {
        self.attached.remove(&element);
        self.ops.push(HostOp::Remove { element });
    }
}

impl<T: OverlayHost + ?Sized> OverlayHost for &mut T {
    fn add_overlay(
        &mut self,
        element: ElementHandle,
        location: Rect,
        index: usize,
        style_class: &str,
    ) {
        (**self).add_overlay(element, location, index, style_class);
    }

    fn update_overlay(&mut self, element: ElementHandle, location: Rect) {
        (**self).update_overlay(element, location);
    }

    fn remove_overlay(&mut self, element: ElementHandle) {
        (**self).remove_overlay(element);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedrawStats {
    pub attached: usize,
    pub updated: usize,
    pub detached: usize,
}

#[derive(Debug, Clone)]
struct GroupState {
    group: OverlayGroup,
    created: usize,
}

/// Single owner of the overlay collection.
#[derive(Debug, Clone)]
pub struct OverlayEngine<R = NoRotation> {
    overlays: Vec<Overlay>,
    groups: FxHashMap<String, GroupState>,
    transforms: Vec<TiledImageTransform>,
    rotation: R,
    rotation_degrees: f64,
    tolerance: f64,
    drawing: Option<OverlayKey>,
    next_element: u64,
}

impl OverlayEngine<NoRotation> {
    #[must_use]
    pub fn new(config: &ViewerConfig) -> Self {
        Self::with_rotation(config, NoRotation)
    }
}

impl<R: RotationCompensation> OverlayEngine<R> {
    #[must_use]
    pub fn with_rotation(config: &ViewerConfig, rotation: R) -> Self {
        let groups = config
            .overlay_groups
            .iter()
            .map(|group| {
                (
                    group.name.clone(),
                    GroupState {
                        group: group.clone(),
                        created: 0,
                    },
                )
            })
            .collect();
        Self {
            overlays: Vec::new(),
            groups,
            transforms: Vec::new(),
            rotation,
            rotation_degrees: 0.0,
            tolerance: config.hit_tolerance,
            drawing: None,
            next_element: 0,
        }
    }

    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Replace the per-image transforms after a new layout.
    pub fn set_transforms(&mut self, transforms: Vec<TiledImageTransform>) {
        self.transforms = transforms;
    }

    #[must_use]
    pub fn transforms(&self) -> &[TiledImageTransform] {
        &self.transforms
    }

    pub fn set_rotation(&mut self, rotation_degrees: f64) {
        self.rotation_degrees = rotation_degrees;
    }

    pub fn add_group(&mut self, group: OverlayGroup) {
        self.groups
            .entry(group.name.clone())
            .and_modify(|state| state.group = group.clone())
            .or_insert(GroupState { group, created: 0 });
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&OverlayGroup> {
        self.groups.get(name).map(|state| &state.group)
    }

    fn transform(&self, image_index: usize) -> Result<&TiledImageTransform, OverlayError> {
        self.transforms
            .get(image_index)
            .ok_or(OverlayError::UnknownImageIndex {
                index: image_index,
                count: self.transforms.len(),
            })
    }

    fn project(&self, transform: &TiledImageTransform, point: Point) -> Point {
        let scaled = Point::new(
            point.x / SCALE_TO_ORIGINAL_SIZE,
            point.y / SCALE_TO_ORIGINAL_SIZE,
        );
        self.rotation
            .get_rotated(transform.image_to_viewport(scaled), self.rotation_degrees)
    }

    fn unproject(transform: &TiledImageTransform, point: Point) -> Point {
        let image = transform.viewport_to_image(point);
        Point::new(
            image.x * SCALE_TO_ORIGINAL_SIZE,
            image.y * SCALE_TO_ORIGINAL_SIZE,
        )
    }

    /// Original-image pixels of sub-image `image_index` to viewport units.
    pub fn image_to_viewport(
        &self,
        point: Point,
        image_index: usize,
    ) -> Result<Point, OverlayError> {
        let transform = self.transform(image_index)?;
        Ok(self.project(transform, point))
    }

    pub fn viewport_to_image(
        &self,
        point: Point,
        image_index: usize,
    ) -> Result<Point, OverlayError> {
        let transform = self.transform(image_index)?;
        Ok(Self::unproject(transform, point))
    }

    pub fn shape_to_viewport(
        &self,
        shape: OverlayShape,
        image_index: usize,
    ) -> Result<OverlayShape, OverlayError> {
        let transform = self.transform(image_index)?;
        Ok(shape.map_points(|point| self.project(transform, point)))
    }

    pub fn shape_to_image(
        &self,
        shape: OverlayShape,
        image_index: usize,
    ) -> Result<OverlayShape, OverlayError> {
        let transform = self.transform(image_index)?;
        Ok(shape.map_points(|point| Self::unproject(transform, point)))
    }

    /// Add an overlay given in viewport coordinates.
    ///
    /// Without an explicit id the overlay gets its creation index within the
    /// group.
    pub fn add_overlay(
        &mut self,
        group: &str,
        id: Option<String>,
        shape: OverlayShape,
        image_index: usize,
        title: Option<String>,
    ) -> Result<OverlayKey, OverlayError> {
        let state = self
            .groups
            .get_mut(group)
            .ok_or_else(|| OverlayError::UnknownGroup {
                name: group.to_string(),
            })?;
        let taken = |id: &str| {
            self.overlays
                .iter()
                .any(|overlay| overlay.key.group == group && overlay.key.id == id)
        };
        let id = match id {
            Some(id) if taken(&id) => {
                return Err(OverlayError::DuplicateOverlay {
                    group: group.to_string(),
                    id,
                });
            }
            Some(id) => {
                state.created += 1;
                id
            }
            // Auto ids skip over ids that were given explicitly.
            None => loop {
                let candidate = state.created.to_string();
                state.created += 1;
                if !taken(&candidate) {
                    break candidate;
                }
            },
        };
        let key = OverlayKey::new(group, id);
        debug!("Added overlay {}/{}", key.group, key.id);
        self.overlays.push(Overlay {
            key: key.clone(),
            shape,
            title,
            image_index,
            hidden: false,
            element: None,
        });
        Ok(key)
    }

    /// Add an overlay given in original-image pixels of `image_index`.
    pub fn add_image_overlay(
        &mut self,
        group: &str,
        id: Option<String>,
        image_shape: OverlayShape,
        image_index: usize,
        title: Option<String>,
    ) -> Result<OverlayKey, OverlayError> {
        let shape = self.shape_to_viewport(image_shape, image_index)?;
        self.add_overlay(group, id, shape, image_index, title)
    }

    #[must_use]
    pub fn get(&self, key: &OverlayKey) -> Option<&Overlay> {
        self.overlays.iter().find(|overlay| &overlay.key == key)
    }

    fn get_mut(&mut self, key: &OverlayKey) -> Result<&mut Overlay, OverlayError> {
        self.overlays
            .iter_mut()
            .find(|overlay| &overlay.key == key)
            .ok_or_else(|| OverlayError::UnknownOverlay {
                group: key.group.clone(),
                id: key.id.clone(),
            })
    }

    /// All overlays in draw order.
    #[must_use]
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn update_shape(
        &mut self,
        key: &OverlayKey,
        shape: OverlayShape,
    ) -> Result<(), OverlayError> {
        self.get_mut(key)?.shape = shape;
        Ok(())
    }

    pub fn set_hidden(&mut self, key: &OverlayKey, hidden: bool) -> Result<(), OverlayError> {
        self.get_mut(key)?.hidden = hidden;
        Ok(())
    }

    pub fn set_group_hidden(&mut self, name: &str, hidden: bool) -> Result<(), OverlayError> {
        let state = self
            .groups
            .get_mut(name)
            .ok_or_else(|| OverlayError::UnknownGroup {
                name: name.to_string(),
            })?;
        state.group.hidden = hidden;
        Ok(())
    }

    /// Detach the overlay's element and drop it from the collection.
    pub fn remove_overlay<H: OverlayHost>(
        &mut self,
        key: &OverlayKey,
        host: &mut H,
    ) -> Option<Overlay> {
        let position = self.overlays.iter().position(|overlay| &overlay.key == key)?;
        let mut overlay = self.overlays.remove(position);
        if let Some(element) = overlay.element.take() {
            host.remove_overlay(element);
        }
        if self.drawing.as_ref() == Some(key) {
            self.drawing = None;
        }
        debug!("Removed overlay {}/{}", key.group, key.id);
        Some(overlay)
    }

    /// Remove every overlay of `group`, returning how many went.
    pub fn clear_group<H: OverlayHost>(&mut self, group: &str, host: &mut H) -> usize {
        let keys: Vec<OverlayKey> = self
            .overlays
            .iter()
            .filter(|overlay| overlay.key.group == group)
            .map(|overlay| overlay.key.clone())
            .collect();
        for key in &keys {
            self.remove_overlay(key, host);
        }
        keys.len()
    }

    fn is_visible(&self, overlay: &Overlay) -> bool {
        !overlay.hidden
            && self
                .groups
                .get(&overlay.key.group)
                .is_some_and(|state| !state.group.hidden)
    }

    fn style_class(&self, overlay: &Overlay) -> &str {
        self.groups
            .get(&overlay.key.group)
            .map_or("", |state| state.group.style_class.as_str())
    }

    fn allocate_element(&mut self) -> ElementHandle {
        let element = ElementHandle(self.next_element);
        self.next_element += 1;
        element
    }

    /// Sync the host with the overlays that should show inside `visible`.
    ///
    /// The overlay being drawn stays attached even when outside the bounds.
    pub fn redraw<H: OverlayHost>(&mut self, visible: Rect, host: &mut H) -> RedrawStats {
        let mut stats = RedrawStats::default();
        for index in 0..self.overlays.len() {
            let overlay = &self.overlays[index];
            let location = overlay.shape.bounds();
            let is_drawing = self.drawing.as_ref() == Some(&overlay.key);
            let wanted =
                self.is_visible(overlay) && (is_drawing || location.intersects(visible));
            match (wanted, overlay.element) {
                (true, Some(element)) => {
                    host.update_overlay(element, location);
                    stats.updated += 1;
                }
                (true, None) => {
                    let style_class = self.style_class(overlay).to_string();
                    let element = self.allocate_element();
                    host.add_overlay(element, location, index, &style_class);
                    self.overlays[index].element = Some(element);
                    stats.attached += 1;
                }
                (false, Some(element)) => {
                    host.remove_overlay(element);
                    self.overlays[index].element = None;
                    stats.detached += 1;
                }
                (false, None) => {}
            }
        }
        debug!(
            "Overlay redraw: {} attached, {} updated, {} detached",
            stats.attached, stats.updated, stats.detached
        );
        stats
    }

    /// Attach the overlay's element regardless of the visible bounds.
    pub fn focus<H: OverlayHost>(
        &mut self,
        key: &OverlayKey,
        host: &mut H,
    ) -> Result<ElementHandle, OverlayError> {
        let position = self
            .overlays
            .iter()
            .position(|overlay| &overlay.key == key)
            .ok_or_else(|| OverlayError::UnknownOverlay {
                group: key.group.clone(),
                id: key.id.clone(),
            })?;
        if let Some(element) = self.overlays[position].element {
            return Ok(element);
        }
        let location = self.overlays[position].shape.bounds();
        let style_class = self.style_class(&self.overlays[position]).to_string();
        let element = self.allocate_element();
        host.add_overlay(element, location, position, &style_class);
        self.overlays[position].element = Some(element);
        Ok(element)
    }

    /// Bounding box grown by the hit tolerance.
    #[must_use]
    pub fn hit_box(&self, key: &OverlayKey) -> Option<Rect> {
        self.get(key)
            .map(|overlay| overlay.shape.bounds().expand(self.tolerance))
    }

    /// Visible overlays whose hit box contains `point`, topmost first.
    #[must_use]
    pub fn overlays_at(&self, point: Point) -> Vec<&OverlayKey> {
        self.overlays
            .iter()
            .rev()
            .filter(|overlay| self.is_visible(overlay))
            .filter(|overlay| overlay.shape.bounds().expand(self.tolerance).contains(point))
            .map(|overlay| &overlay.key)
            .collect()
    }

    /// Classify `point` against a rectangle overlay.
    #[must_use]
    pub fn hit_test(&self, key: &OverlayKey, point: Point) -> Option<HitArea> {
        match self.get(key)?.shape {
            OverlayShape::Rectangle(rect) => hit::hit_test(rect, point, self.tolerance),
            OverlayShape::Line { .. } => None,
        }
    }

    /// Claim the drawing slot, returning the key it displaced.
    pub fn begin_drawing(&mut self, key: OverlayKey) -> Option<OverlayKey> {
        let displaced = self.drawing.replace(key);
        if let Some(previous) = &displaced {
            warn!(
                "Drawing of {}/{} interrupted by a new drawing",
                previous.group, previous.id
            );
        }
        displaced
    }

    pub fn end_drawing(&mut self) -> Option<OverlayKey> {
        self.drawing.take()
    }

    #[must_use]
    pub fn drawing(&self) -> Option<&OverlayKey> {
        self.drawing.as_ref()
    }
}
