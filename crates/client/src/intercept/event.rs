//! Lifetime extension for worker events.
use std::future::Future;

use tokio::task::JoinSet;

/// Work attached to an event that may outlive the response it produced.
///
/// The host keeps the worker alive until [`ExtendableEvent::settled`] returns.
#[derive(Default)]
pub struct ExtendableEvent {
    tasks: JoinSet<()>,
}

impl ExtendableEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detach `work` from the caller; the event is not settled until it finishes.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(work);
    }

    /// Number of unfinished extensions.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every extension. Panicked tasks are logged and skipped.
    pub async fn settled(mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("event extension failed: {}", e);
            }
        }
    }
}
