//! UI toggle flags.
//!
//! Named booleans that live for the process only. Everything starts closed.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A named UI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    /// Slide-out cart drawer.
    CartDrawer,
    /// Catalog filter sidebar.
    FilterPanel,
    /// Collapsed navigation menu.
    MobileMenu,
}

/// Set of currently open toggles.
#[derive(Debug, Default)]
pub struct UiToggles {
    open: Mutex<HashSet<Toggle>>,
}

impl UiToggles {
    /// All toggles closed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Toggle>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open(&self, toggle: Toggle) {
        self.lock().insert(toggle);
    }

    pub fn close(&self, toggle: Toggle) {
        self.lock().remove(&toggle);
    }

    /// Flip a toggle, returning its new state.
    pub fn toggle(&self, toggle: Toggle) -> bool {
        let mut open = self.lock();
        if open.remove(&toggle) {
            false
        } else {
            open.insert(toggle);
            true
        }
    }

    #[must_use]
    pub fn is_open(&self, toggle: Toggle) -> bool {
        self.lock().contains(&toggle)
    }
}
