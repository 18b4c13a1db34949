//! What application code reports through.
//!
//! Neither variant can fail observably: the active one only enqueues, the
//! null one does nothing at all.

use std::sync::Arc;

use super::pool::Queue;
use crate::types::Hit;

/// Reporter handed out by [`Analytics::active`](super::Analytics::active).
#[derive(Debug, Clone)]
pub enum Reporter {
    /// Hits go to the dispatch queue
    Active(ActiveReporter),
    /// Analytics are disabled; hits are discarded on the spot
    Null(NullReporter),
}

impl Reporter {
    /// Record an event without waiting for the tracker
    pub fn track_event(&self, category: &str, action: &str, label: &str, value: i32) {
        match self {
            Reporter::Active(r) => r.track_event(category, action, label, value),
            Reporter::Null(r) => r.track_event(category, action, label, value),
        }
    }

    /// Record a page view without waiting for the tracker
    pub fn track_page_view(&self, path: &str) {
        match self {
            Reporter::Active(r) => r.track_page_view(path),
            Reporter::Null(r) => r.track_page_view(path),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Reporter::Active(_))
    }
}

/// Enqueues one hit per call.
#[derive(Debug, Clone)]
pub struct ActiveReporter {
    queue: Arc<Queue>,
}

impl ActiveReporter {
    pub(crate) fn new(queue: Arc<Queue>) -> Self {
        Self { queue }
    }

    pub fn track_event(&self, category: &str, action: &str, label: &str, value: i32) {
        self.queue.submit(Hit::event(category, action, label, value));
    }

    pub fn track_page_view(&self, path: &str) {
        self.queue.submit(Hit::page_view(path));
    }
}

/// Inert reporter used while analytics are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl NullReporter {
    pub fn track_event(&self, _category: &str, _action: &str, _label: &str, _value: i32) {}

    pub fn track_page_view(&self, _path: &str) {}
}
