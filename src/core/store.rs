use async_trait::async_trait;

use crate::{core::state::EngineState, prelude::*};

/// Durable storage of a single instance's [`EngineState`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved state, [`None`] if nothing has been saved yet.
    async fn load(&self) -> Result<Option<EngineState>>;

    async fn save(&self, state: &EngineState) -> Result;

    /// Forget the state when the instance is removed.
    async fn delete(&self) -> Result;
}
