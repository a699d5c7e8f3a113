use async_trait::async_trait;

use crate::{
    core::output::{Channel, OutputRecord},
    prelude::*,
    quantity::cost::Cost,
};

/// Receiver of the computed cost readings of a single instance.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn publish(&self, channel: Channel, record: &OutputRecord) -> Result;

    /// Last value displayed on the channel before the restart, if the sink remembers one.
    async fn restore_last_displayed(&self, channel: Channel) -> Result<Option<Cost>>;
}
