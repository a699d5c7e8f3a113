use async_trait::async_trait;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::prelude::*;

/// Where the live sensor readings come from.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Current raw state of the entity, [`None`] when it is unknown or unavailable.
    async fn get_current(&self, entity_id: &str) -> Result<Option<String>>;

    /// Start watching the entity and deliver every new raw state in order.
    fn subscribe(&self, entity_id: &str) -> Subscription;
}

/// Stream of raw state changes of a single entity.
///
/// Dropping the subscription stops the background watcher, if any.
#[must_use]
pub struct Subscription {
    receiver: mpsc::Receiver<String>,
    watcher: Option<JoinHandle<()>>,
}

impl Subscription {
    pub const fn new(receiver: mpsc::Receiver<String>, watcher: Option<JoinHandle<()>>) -> Self {
        Self { receiver, watcher }
    }

    /// Wait for the next state change, [`None`] when the source has gone away.
    pub async fn next(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
