use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, oneshot},
    time::sleep,
};

use crate::{
    core::{state::EngineState, store::StateStore},
    prelude::*,
};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

enum Command {
    Save(EngineState),
    Flush(oneshot::Sender<()>),
}

/// Moves the writes off the caller's path.
///
/// A single writer task applies the saves in order and skips a queued state when a newer one
/// is already waiting, so that a stale state never overwrites a later one.
pub struct QueuedStore {
    inner: Arc<dyn StateStore>,
    sender: mpsc::UnboundedSender<Command>,
}

impl QueuedStore {
    /// Start the writer task. Must be called within a Tokio runtime.
    pub fn spawn(inner: Arc<dyn StateStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(inner.clone(), receiver));
        Self { inner, sender }
    }

    /// Wait until everything queued so far has been written or given up on.
    pub async fn flush(&self) -> Result {
        let (ack_sender, ack_receiver) = oneshot::channel();
        self.sender
            .send(Command::Flush(ack_sender))
            .map_err(|_| anyhow!("the state writer has stopped"))?;
        ack_receiver.await.context("the state writer has stopped")
    }
}

#[async_trait]
impl StateStore for QueuedStore {
    async fn load(&self) -> Result<Option<EngineState>> {
        self.inner.load().await
    }

    async fn save(&self, state: &EngineState) -> Result {
        self.sender
            .send(Command::Save(state.clone()))
            .map_err(|_| anyhow!("the state writer has stopped"))
    }

    async fn delete(&self) -> Result {
        self.flush().await?;
        self.inner.delete().await
    }
}

async fn write_loop(store: Arc<dyn StateStore>, mut receiver: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = receiver.recv().await {
        let mut latest = None;
        let mut acks = Vec::new();
        let mut next = Some(command);
        while let Some(command) = next {
            match command {
                Command::Save(state) => latest = Some(state),
                Command::Flush(ack) => acks.push(ack),
            }
            next = receiver.try_recv().ok();
        }
        if let Some(state) = latest {
            write_with_retry(store.as_ref(), &state).await;
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
    debug!("state writer stopped");
}

async fn write_with_retry(store: &dyn StateStore, state: &EngineState) {
    for attempt in 1..=MAX_ATTEMPTS {
        match store.save(state).await {
            Ok(()) => return,
            Err(error) if attempt < MAX_ATTEMPTS => {
                warn!(attempt, error = format!("{error:#}"), "failed to save the state, retrying…");
                sleep(RETRY_DELAY * attempt).await;
            }
            Err(error) => {
                error!(
                    attempt,
                    error = format!("{error:#}"),
                    "failed to save the state, waiting for the next one",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{Instant, timeout};

    use super::*;
    use crate::{quantity::energy::KilowattHours, testing::MemoryStore};

    fn state(counter: f64) -> EngineState {
        EngineState { previous_counter: Some(KilowattHours(counter)), ..Default::default() }
    }

    #[tokio::test]
    async fn test_save_does_not_wait_for_slow_store() -> Result {
        let inner = Arc::new(MemoryStore::default().with_save_delay(Duration::from_millis(300)));
        let store = QueuedStore::spawn(inner.clone());

        let started_at = Instant::now();
        timeout(Duration::from_millis(100), store.save(&state(1.0))).await??;
        assert!(started_at.elapsed() < Duration::from_millis(100));

        store.flush().await?;
        assert_eq!(inner.saved(), Some(state(1.0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_writes_keep_order_and_skip_stale() -> Result {
        let inner = Arc::new(MemoryStore::default().with_save_delay(Duration::from_millis(20)));
        let store = QueuedStore::spawn(inner.clone());
        for counter in 1..=10 {
            store.save(&state(f64::from(counter))).await?;
        }
        store.flush().await?;

        let history = inner.history();
        assert_eq!(history.last(), Some(&state(10.0)));
        assert!(history.len() <= 10);
        assert!(
            history
                .windows(2)
                .all(|pair| pair[0].previous_counter < pair[1].previous_counter)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_retries_failed_write() -> Result {
        let inner = Arc::new(MemoryStore::default().failing_first_saves(2));
        let store = QueuedStore::spawn(inner.clone());
        store.save(&state(1.0)).await?;
        store.flush().await?;
        assert_eq!(inner.n_save_attempts(), 3);
        assert_eq!(inner.saved(), Some(state(1.0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_gives_up_and_writes_next_state() -> Result {
        let inner = Arc::new(MemoryStore::default().failing_first_saves(3));
        let store = QueuedStore::spawn(inner.clone());
        store.save(&state(1.0)).await?;
        store.flush().await?;
        assert_eq!(inner.saved(), None);

        store.save(&state(2.0)).await?;
        store.flush().await?;
        assert_eq!(inner.saved(), Some(state(2.0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_after_pending_writes() -> Result {
        let inner = Arc::new(MemoryStore::default().with_save_delay(Duration::from_millis(20)));
        let store = QueuedStore::spawn(inner.clone());
        store.save(&state(1.0)).await?;
        store.delete().await?;
        assert!(inner.is_deleted());
        assert_eq!(inner.saved(), None);
        Ok(())
    }
}
