//! Viewer notifications and cancellable listeners.

use std::fmt;

use dz_core::{ImageSize, Rect};
use serde::{Deserialize, Serialize};

/// Notifications raised by the deep-zoom widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewerEvent {
    /// Sizes of the opened images, in layout order.
    Open { image_sizes: Vec<ImageSize> },
    OpenFailed { message: String },
    Resize,
    Rotate { degrees: f64 },
    UpdateViewport { visible: Rect },
    TileLoaded,
    TileLoadFailed { message: String },
}

impl ViewerEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::OpenFailed { .. } => "open-failed",
            Self::Resize => "resize",
            Self::Rotate { .. } => "rotate",
            Self::UpdateViewport { .. } => "update-viewport",
            Self::TileLoaded => "tile-loaded",
            Self::TileLoadFailed { .. } => "tile-load-failed",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&ViewerEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(Subscription, Listener)>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ViewerEvent) + 'static) -> Subscription {
        let subscription = Subscription(self.next_id);
        self.next_id += 1;
        self.listeners.push((subscription, Box::new(listener)));
        subscription
    }

    /// Drop a listener. Returns false when it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn emit(&mut self, event: &ViewerEvent) -> usize {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
        self.listeners.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
