//! Window event routing to renderers.
//!
//! Each renderer registers a watch on its target window when it is created
//! and removes it before it is destroyed, so events are only ever delivered
//! to live renderers.

use tessera_types::{WindowEvent, WindowId};

use crate::system::RendererId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Watch {
    renderer: RendererId,
    window: WindowId,
}

#[derive(Debug, Default)]
pub struct EventBridge {
    watches: Vec<Watch>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, renderer: RendererId, window: WindowId) {
        self.watches.push(Watch { renderer, window });
    }

    pub fn unwatch(&mut self, renderer: RendererId) {
        self.watches.retain(|w| w.renderer != renderer);
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Renderers that target the event's window, in registration order.
    pub fn targets(&self, event: &WindowEvent) -> Vec<RendererId> {
        self.watches
            .iter()
            .filter(|w| w.window == event.window)
            .map(|w| w.renderer)
            .collect()
    }
}
