//! Mock navigator for testing.

use crate::providers::Navigator;
use std::sync::{Arc, Mutex, PoisonError};

/// Records every navigation target instead of navigating.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    /// Create a navigator with no recorded visits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All targets navigated to, oldest first.
    #[must_use]
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}
