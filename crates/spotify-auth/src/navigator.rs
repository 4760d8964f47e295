//! Page location capability
//!
//! `current_url` is where the callback handler reads the authorization
//! response from; `assign` sends the user to the provider; `replace` rewrites
//! the visible location without adding a history entry.

use std::sync::Mutex;

use tracing::debug;
use url::Url;

/// Access to the host page's location.
pub trait Navigator: Send + Sync {
    /// Current location, or `None` when there is no page at all.
    fn current_url(&self) -> Option<Url>;

    /// Navigate away to `url`.
    fn assign(&self, url: &Url);

    /// Replace the current location in place (no new history entry).
    fn replace(&self, url: &Url);
}

/// In-process navigator that records navigation instead of performing it.
///
/// Used by the headless binary (which prints the assigned URL for the user
/// to open) and by tests.
#[derive(Debug, Default)]
pub struct MemoryNavigator {
    current: Mutex<Option<Url>>,
    assigned: Mutex<Vec<Url>>,
}

impl MemoryNavigator {
    /// Navigator positioned at `url`.
    pub fn at(url: Url) -> Self {
        Self {
            current: Mutex::new(Some(url)),
            assigned: Mutex::new(Vec::new()),
        }
    }

    /// Navigator with no page.
    pub fn detached() -> Self {
        Self::default()
    }

    /// URLs passed to `assign`, oldest first.
    pub fn assigned(&self) -> Vec<Url> {
        self.assigned
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Most recent URL passed to `assign`.
    pub fn last_assigned(&self) -> Option<Url> {
        self.assigned().pop()
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Option<Url> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    fn assign(&self, url: &Url) {
        debug!(host = url.host_str().unwrap_or_default(), "navigating away");
        if let Ok(mut assigned) = self.assigned.lock() {
            assigned.push(url.clone());
        }
    }

    fn replace(&self, url: &Url) {
        if let Ok(mut current) = self.current.lock() {
            // Detached navigators stay detached.
            if current.is_some() {
                *current = Some(url.clone());
            }
        }
    }
}
