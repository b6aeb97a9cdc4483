use log::warn;
use std::collections::VecDeque;

use crate::db::models::WindowChangeEvent;

/// Above this many pending events every append logs a warning. Nothing is
/// dropped: the buffer keeps growing while the store is unreachable.
pub const BUFFER_WARN_THRESHOLD: usize = 10_000;

#[derive(Debug, Default)]
pub struct EventBuffer {
    events: VecDeque<WindowChangeEvent>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: WindowChangeEvent) {
        self.events.push_back(event);
        if self.events.len() > BUFFER_WARN_THRESHOLD {
            warn!(
                "{} events pending persistence; the data store may be unreachable",
                self.events.len()
            );
        }
    }

    /// Hands every pending event to the caller and leaves the buffer empty.
    pub fn take(&mut self) -> Vec<WindowChangeEvent> {
        std::mem::take(&mut self.events).into()
    }

    /// Puts a batch that failed to persist back in front of anything appended
    /// since it was taken, preserving the original order.
    pub fn restore(&mut self, batch: Vec<WindowChangeEvent>) {
        for event in batch.into_iter().rev() {
            self.events.push_front(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowChangeEvent> {
        self.events.iter()
    }
}
