//! View lifetimes.
//!
//! A [`ViewScope`] stands for the screen that issued a request. Once the
//! scope is unmounted, results of requests it guarded are discarded instead
//! of being handed back to stale UI state.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Mount state of one view.
#[derive(Debug, Clone)]
pub struct ViewScope {
    unmounted: Arc<watch::Sender<bool>>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    /// A mounted scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            unmounted: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Mark the view as gone. Pending guarded requests resolve to `None`.
    pub fn unmount(&self) {
        self.unmounted.send_replace(true);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !*self.unmounted.borrow()
    }

    /// Run `fut` unless the scope unmounts first.
    ///
    /// Returns `None` if the scope was already unmounted, unmounts while
    /// `fut` is pending, or unmounts before the output is observed.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut rx = self.unmounted.subscribe();
        tokio::select! {
            biased;
            _ = rx.wait_for(|unmounted| *unmounted) => {
                debug!("View unmounted; discarding pending result");
                None
            }
            output = fut => self.is_mounted().then_some(output),
        }
    }
}
