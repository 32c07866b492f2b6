use parking_lot::Mutex;
use std::sync::Arc;

/// Single-slot holder for a search requested before the widget is ready.
///
/// Writers replace whatever is stored; the reader takes the value out, so a
/// deposited query is consumed at most once. Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct PendingQuery {
    slot: Arc<Mutex<Option<String>>>,
}

impl PendingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `query`, returning the query it displaced.
    pub fn offer(&self, query: impl Into<String>) -> Option<String> {
        self.slot.lock().replace(query.into())
    }

    /// Removes and returns the stored query.
    pub fn take(&self) -> Option<String> {
        self.slot.lock().take()
    }

    pub fn peek(&self) -> Option<String> {
        self.slot.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}
