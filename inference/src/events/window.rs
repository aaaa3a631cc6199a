//! Bounded recent-event window.

use std::collections::VecDeque;

use super::types::Event;

/// Default number of events retained per subject window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 200;

/// Ordered, bounded window of the most recent events for one subject.
///
/// Pushing past capacity evicts the oldest event.
#[derive(Debug, Clone)]
pub struct EventWindow {
    events: VecDeque<Event>,
    capacity: usize,
}

impl EventWindow {
    /// Create an empty window. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a window from an ordered event list, keeping the newest `capacity`.
    pub fn from_events(events: impl IntoIterator<Item = Event>, capacity: usize) -> Self {
        let mut window = Self::new(capacity);
        window.extend(events);
        window
    }

    /// Append one event, evicting the oldest if full.
    pub fn push(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}
