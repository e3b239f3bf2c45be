#![forbid(unsafe_code)]

//! One viewer instance.
//!
//! [`ViewerSession`] owns every stage of the engine as a named field and runs
//! them in order: resolution results are laid out, the widget's `open`
//! notification triggers measuring, and every measure pass is followed by an
//! overlay redraw. Late results from a superseded view are dropped by
//! comparing [`ViewTicket`] generations.

mod events;
mod persistence;

pub use events::{EventBus, Subscription, ViewerEvent};
pub use persistence::{
    LOCATION_STORAGE_KEY, LocationStore, MemoryLocationStore, ViewportLocation, load_location,
    save_location,
};

use dz_core::{
    ImageSize, LayoutError, Point, Rect, ResolutionError, TileSource, ViewerConfig, ViewerError,
    ViewerErrorCode,
};
use dz_layout::{LayoutSlot, composite_bounds, image_index_at, image_transforms, layout};
use dz_overlay::{
    DrawState, HitArea, LineDrawer, OverlayEngine, OverlayError, OverlayHost, OverlayKey,
    OverlayShape, RectangleDrawer, TransformDrawer,
};
use dz_tilesource::{JsonFetcher, Resolver, TileSourceReference};
use dz_viewport::{Container, Controls, MeasureOptions, ViewState, ViewportMeasures, ZoomLimits};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Identifies the view a pending resolution was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ViewTicket(u64);

impl ViewTicket {
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum SessionStatus {
    Idle,
    Loading,
    /// Laid out, waiting for the widget to open the images.
    Opened,
    Ready,
    Failed {
        code: ViewerErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpenOutcome {
    Opened { image_count: usize },
    /// The ticket belonged to a superseded view.
    Discarded { ticket: u64, current: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TileCounters {
    pub loaded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DrawMode {
    None,
    Rectangle {
        group: String,
        current: Option<OverlayKey>,
    },
    Line {
        group: String,
        current: Option<OverlayKey>,
    },
    Transform {
        key: OverlayKey,
    },
}

pub struct ViewerSession {
    config: ViewerConfig,
    generation: u64,
    status: SessionStatus,
    slots: Vec<LayoutSlot>,
    measures: Option<ViewportMeasures>,
    visible: Option<Rect>,
    tiles: TileCounters,
    draw_mode: DrawMode,
    store: Option<Box<dyn LocationStore>>,
    pub controls: Controls,
    pub overlays: OverlayEngine,
    pub rectangle_drawer: RectangleDrawer,
    pub line_drawer: LineDrawer,
    pub transform_drawer: TransformDrawer,
    pub events: EventBus,
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("generation", &self.generation)
            .field("status", &self.status)
            .field("slots", &self.slots.len())
            .field("overlays", &self.overlays.len())
            .finish_non_exhaustive()
    }
}

impl ViewerSession {
    /// Build the components in dependency order from `config`.
    #[must_use]
    pub fn new(config: ViewerConfig) -> Self {
        let controls = Controls::new(ZoomLimits::from_config(&config));
        let overlays = OverlayEngine::new(&config);
        let transform_drawer = TransformDrawer::new(config.hit_tolerance);
        Self {
            config,
            generation: 0,
            status: SessionStatus::Idle,
            slots: Vec::new(),
            measures: None,
            visible: None,
            tiles: TileCounters::default(),
            draw_mode: DrawMode::None,
            store: None,
            controls,
            overlays,
            rectangle_drawer: RectangleDrawer::new(),
            line_drawer: LineDrawer::new(),
            transform_drawer,
            events: EventBus::new(),
        }
    }

    #[must_use]
    pub fn with_location_store(mut self, store: impl LocationStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub const fn status(&self) -> &SessionStatus {
        &self.status
    }

    #[must_use]
    pub fn slots(&self) -> &[LayoutSlot] {
        &self.slots
    }

    #[must_use]
    pub const fn measures(&self) -> Option<&ViewportMeasures> {
        self.measures.as_ref()
    }

    #[must_use]
    pub const fn tile_counters(&self) -> TileCounters {
        self.tiles
    }

    /// Start a new view, invalidating every outstanding ticket.
    pub fn begin_view(&mut self) -> ViewTicket {
        self.generation += 1;
        self.status = SessionStatus::Loading;
        self.slots.clear();
        self.measures = None;
        self.visible = None;
        self.overlays.set_transforms(Vec::new());
        info!("Beginning view generation {}", self.generation);
        ViewTicket(self.generation)
    }

    #[must_use]
    pub const fn is_current(&self, ticket: ViewTicket) -> bool {
        ticket.0 == self.generation
    }

    fn fail(&mut self, err: ViewerError) -> ViewerError {
        warn!("Viewer failed: {err}");
        self.status = SessionStatus::Failed {
            code: err.code(),
            message: err.to_string(),
        };
        err
    }

    /// Apply the resolution result of `ticket` and lay it out.
    ///
    /// Results for an older ticket are discarded without touching the
    /// session.
    pub fn open(
        &mut self,
        ticket: ViewTicket,
        resolved: Result<Vec<TileSource>, ResolutionError>,
    ) -> Result<OpenOutcome, ViewerError> {
        if !self.is_current(ticket) {
            debug!(
                "Discarding resolution for generation {} (current {})",
                ticket.0, self.generation
            );
            return Ok(OpenOutcome::Discarded {
                ticket: ticket.0,
                current: self.generation,
            });
        }
        let descriptors = resolved.map_err(|err| self.fail(err.into()))?;
        let slots = layout(descriptors).map_err(|err| self.fail(err.into()))?;
        let image_count = slots.len();
        self.slots = slots;
        self.status = SessionStatus::Opened;
        info!("Opened view with {image_count} images");
        Ok(OpenOutcome::Opened { image_count })
    }

    /// Resolve every reference, then open the result under a fresh ticket.
    pub fn resolve_and_open<F: JsonFetcher>(
        &mut self,
        resolver: &Resolver<F>,
        references: &[TileSourceReference],
    ) -> Result<OpenOutcome, ViewerError> {
        let ticket = self.begin_view();
        let resolved = resolver.resolve_all(references);
        self.open(ticket, resolved)
    }

    /// React to a widget notification.
    ///
    /// Measures are recomputed before the overlay redraw that depends on
    /// them; listeners see the event afterwards.
    pub fn handle_event<C, H>(
        &mut self,
        event: ViewerEvent,
        container: &mut C,
        host: &mut H,
    ) -> Result<(), ViewerError>
    where
        C: Container + ?Sized,
        H: OverlayHost,
    {
        debug!("Handling {} event", event.name());
        match &event {
            ViewerEvent::Open { image_sizes } => {
                self.on_open(image_sizes, container)
                    .map_err(|err| self.fail(err))?;
                self.redraw(host);
            }
            ViewerEvent::OpenFailed { message } => {
                warn!("Widget failed to open images: {message}");
                self.status = SessionStatus::Failed {
                    code: ViewerErrorCode::Resolution,
                    message: message.clone(),
                };
            }
            ViewerEvent::Resize => {
                if self.measures.is_some() {
                    self.remeasure(container).map_err(|err| self.fail(err))?;
                    self.visible = None;
                    self.redraw(host);
                }
            }
            ViewerEvent::Rotate { degrees } => {
                self.controls.set_rotation(*degrees);
                self.overlays.set_rotation(self.controls.state().rotation);
                if self.measures.is_some() {
                    self.remeasure(container).map_err(|err| self.fail(err))?;
                    self.visible = None;
                    self.redraw(host);
                }
            }
            ViewerEvent::UpdateViewport { visible } => {
                self.visible = Some(*visible);
                self.redraw(host);
                self.save_location();
            }
            ViewerEvent::TileLoaded => self.tiles.loaded += 1,
            ViewerEvent::TileLoadFailed { message } => {
                self.tiles.failed += 1;
                warn!("Tile failed to load: {message}");
            }
        }
        self.events.emit(&event);
        Ok(())
    }

    fn on_open<C: Container + ?Sized>(
        &mut self,
        image_sizes: &[ImageSize],
        container: &mut C,
    ) -> Result<(), ViewerError> {
        if self.slots.is_empty() {
            return Err(LayoutError::Empty.into());
        }
        for size in image_sizes {
            ImageSize::checked(size.width, size.height)?;
        }
        let slots = std::mem::take(&mut self.slots);
        let descriptors: Vec<TileSource> = slots
            .into_iter()
            .zip(image_sizes.iter().copied().map(Some).chain(std::iter::repeat(None)))
            .map(|(slot, size)| match size {
                Some(size) => slot.tile_source.with_size(size),
                None => slot.tile_source,
            })
            .collect();
        self.slots = layout(descriptors)?;
        self.overlays.set_transforms(image_transforms(&self.slots)?);

        self.remeasure(container)?;
        match self.stored_location() {
            Some(location) => self.controls.restore(ViewState {
                center: Point::new(location.x, location.y),
                zoom: location.zoom,
                rotation: location.rotation,
            }),
            None => self.controls.go_home(),
        }
        self.overlays.set_rotation(self.controls.state().rotation);
        self.visible = None;
        self.status = SessionStatus::Ready;
        Ok(())
    }

    fn image_sizes(&self) -> Result<Vec<ImageSize>, LayoutError> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.tile_source
                    .size()
                    .ok_or(LayoutError::UnknownImageSize { index })
            })
            .collect()
    }

    /// Fresh measures for the current container and rotation.
    fn remeasure<C: Container + ?Sized>(&mut self, container: &mut C) -> Result<(), ViewerError> {
        let sizes = self.image_sizes()?;
        let options = MeasureOptions::from_config(&self.config);
        let rotation = self.controls.state().rotation;
        let mut measures = ViewportMeasures::compute(&*container, &sizes, options, rotation)?;
        if options.adapt_container_height {
            measures = measures.resize_canvas(container)?;
        }
        let world = composite_bounds(self.overlays.transforms())
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 1.0, 1.0));
        self.controls.set_home(&measures, world);
        debug!(
            "Measured {} with display {:.1}x{:.1}, home zoom {:.4}",
            measures.fit_mode.as_str(),
            measures.image_display_size.x,
            measures.image_display_size.y,
            self.controls.home_zoom()
        );
        self.measures = Some(measures);
        Ok(())
    }

    /// Area the overlays are synced against.
    #[must_use]
    pub fn visible_bounds(&self) -> Rect {
        self.visible
            .unwrap_or_else(|| self.controls.visible_bounds())
    }

    pub fn redraw<H: OverlayHost>(&mut self, host: &mut H) {
        let visible = self.visible_bounds();
        self.overlays.redraw(visible, host);
    }

    fn stored_location(&self) -> Option<ViewportLocation> {
        let id = self.config.persistence_id.as_deref()?;
        load_location(self.store.as_deref()?, id)
    }

    /// Write the current camera to the location store, if one is set up.
    pub fn save_location(&mut self) {
        let Some(persistence_id) = self.config.persistence_id.clone() else {
            return;
        };
        let Some(store) = self.store.as_deref_mut() else {
            return;
        };
        let state = self.controls.state();
        let location = ViewportLocation {
            x: state.center.x,
            y: state.center.y,
            zoom: state.zoom,
            rotation: state.rotation,
            persistence_id,
        };
        if let Err(err) = save_location(store, &location) {
            warn!("Could not store viewport location: {err}");
        }
    }

    fn interactive_group(&self, group: &str) -> Result<(), OverlayError> {
        let definition = self
            .overlays
            .group(group)
            .ok_or_else(|| OverlayError::UnknownGroup {
                name: group.to_string(),
            })?;
        if definition.interactive {
            Ok(())
        } else {
            Err(OverlayError::NotInteractive {
                name: group.to_string(),
            })
        }
    }

    /// Arm the rectangle drawer for `group`.
    pub fn start_rectangle(&mut self, group: &str) -> Result<(), OverlayError> {
        self.interactive_group(group)?;
        self.end_drawing();
        self.rectangle_drawer.start_drawing();
        self.draw_mode = DrawMode::Rectangle {
            group: group.to_string(),
            current: None,
        };
        Ok(())
    }

    pub fn start_line(&mut self, group: &str) -> Result<(), OverlayError> {
        self.interactive_group(group)?;
        self.end_drawing();
        self.line_drawer.start_drawing();
        self.draw_mode = DrawMode::Line {
            group: group.to_string(),
            current: None,
        };
        Ok(())
    }

    /// Arm the transform drawer on an existing rectangle.
    ///
    /// Returns the overlay whose drawing was interrupted, if any.
    pub fn start_transform(
        &mut self,
        key: &OverlayKey,
    ) -> Result<Option<OverlayKey>, OverlayError> {
        self.interactive_group(&key.group)?;
        let overlay = self
            .overlays
            .get(key)
            .ok_or_else(|| OverlayError::UnknownOverlay {
                group: key.group.clone(),
                id: key.id.clone(),
            })?;
        let OverlayShape::Rectangle(rect) = overlay.shape else {
            return Ok(None);
        };
        self.rectangle_drawer.end_drawing();
        self.line_drawer.end_drawing();
        self.transform_drawer.start_drawing(rect);
        self.draw_mode = DrawMode::Transform { key: key.clone() };
        Ok(self.overlays.begin_drawing(key.clone()))
    }

    /// Leave whichever drawing mode is active.
    pub fn end_drawing(&mut self) {
        self.rectangle_drawer.end_drawing();
        self.line_drawer.end_drawing();
        self.transform_drawer.end_drawing();
        self.overlays.end_drawing();
        self.draw_mode = DrawMode::None;
    }

    fn new_drawn_overlay(
        &mut self,
        group: &str,
        shape: OverlayShape,
        at: Point,
    ) -> Result<OverlayKey, OverlayError> {
        let image_index = image_index_at(self.overlays.transforms(), at).unwrap_or(0);
        let key = self.overlays.add_overlay(group, None, shape, image_index, None)?;
        self.overlays.begin_drawing(key.clone());
        Ok(key)
    }

    /// Pointer press in viewport coordinates.
    ///
    /// New shapes are stored before the drawer starts dragging, so a failed
    /// insert leaves the drawer armed.
    pub fn pointer_down(&mut self, point: Point) -> Result<Option<HitArea>, OverlayError> {
        match self.draw_mode.clone() {
            DrawMode::None => Ok(None),
            DrawMode::Rectangle { group, .. } => {
                if self.rectangle_drawer.state() != DrawState::Armed {
                    return Ok(None);
                }
                let shape = OverlayShape::Rectangle(Rect::new(point.x, point.y, 0.0, 0.0));
                let key = self.new_drawn_overlay(&group, shape, point)?;
                self.rectangle_drawer.pointer_down(point);
                self.draw_mode = DrawMode::Rectangle {
                    group,
                    current: Some(key),
                };
                Ok(Some(HitArea::BottomRight))
            }
            DrawMode::Line { group, .. } => {
                if self.line_drawer.state() != DrawState::Armed {
                    return Ok(None);
                }
                let shape = OverlayShape::Line {
                    start: point,
                    end: point,
                };
                let key = self.new_drawn_overlay(&group, shape, point)?;
                self.line_drawer.pointer_down(point);
                self.draw_mode = DrawMode::Line {
                    group,
                    current: Some(key),
                };
                Ok(Some(HitArea::BottomRight))
            }
            DrawMode::Transform { .. } => Ok(self.transform_drawer.pointer_down(point)),
        }
    }

    fn drawn_shape(&mut self, point: Point, release: bool) -> Option<(OverlayKey, OverlayShape)> {
        match &self.draw_mode {
            DrawMode::None => None,
            DrawMode::Rectangle { current, .. } => {
                let key = current.clone()?;
                let rect = if release {
                    self.rectangle_drawer.pointer_up(point)?
                } else {
                    self.rectangle_drawer.pointer_move(point)?
                };
                Some((key, OverlayShape::Rectangle(rect)))
            }
            DrawMode::Line { current, .. } => {
                let key = current.clone()?;
                let (start, end) = if release {
                    self.line_drawer.pointer_up(point)?
                } else {
                    self.line_drawer.pointer_move(point)?
                };
                Some((key, OverlayShape::Line { start, end }))
            }
            DrawMode::Transform { key } => {
                let key = key.clone();
                let rect = if release {
                    self.transform_drawer.pointer_up(point)?
                } else {
                    self.transform_drawer.pointer_move(point)?
                };
                Some((key, OverlayShape::Rectangle(rect)))
            }
        }
    }

    /// Pointer movement; returns true when an overlay changed.
    pub fn pointer_move<H: OverlayHost>(
        &mut self,
        point: Point,
        host: &mut H,
    ) -> Result<bool, OverlayError> {
        let Some((key, shape)) = self.drawn_shape(point, false) else {
            return Ok(false);
        };
        self.overlays.update_shape(&key, shape)?;
        self.redraw(host);
        Ok(true)
    }

    /// Pointer release; returns the overlay that was drawn or transformed.
    pub fn pointer_up<H: OverlayHost>(
        &mut self,
        point: Point,
        host: &mut H,
    ) -> Result<Option<OverlayKey>, OverlayError> {
        let Some((key, shape)) = self.drawn_shape(point, true) else {
            return Ok(None);
        };
        self.overlays.update_shape(&key, shape)?;
        match &mut self.draw_mode {
            DrawMode::Rectangle { current, .. } | DrawMode::Line { current, .. } => {
                *current = None;
                self.overlays.end_drawing();
            }
            DrawMode::Transform { .. } | DrawMode::None => {}
        }
        self.redraw(host);
        Ok(Some(key))
    }
}
