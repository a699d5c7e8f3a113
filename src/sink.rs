use async_trait::async_trait;

use crate::{
    config::InstanceId,
    core::{
        output::{Channel, OutputRecord},
        sink::OutputSink,
    },
    prelude::*,
    quantity::cost::Cost,
};

/// Only logs the readings, used for dry runs.
#[must_use]
pub struct TracingSink {
    instance_id: InstanceId,
}

impl TracingSink {
    pub const fn new(instance_id: InstanceId) -> Self {
        Self { instance_id }
    }
}

#[async_trait]
impl OutputSink for TracingSink {
    async fn publish(&self, channel: Channel, record: &OutputRecord) -> Result {
        info!(
            instance = %self.instance_id,
            channel = channel.suffix(),
            value = %record.value,
            unit = record.unit.as_str(),
            attributes = %serde_json::Value::Object(record.attributes.clone()),
            "dry run",
        );
        Ok(())
    }

    async fn restore_last_displayed(&self, _channel: Channel) -> Result<Option<Cost>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remembers_nothing() -> Result {
        let sink = TracingSink::new(InstanceId::from("home"));
        sink.publish(Channel::Month, &OutputRecord::restored(Cost(812.34), "NOK")).await?;
        assert_eq!(sink.restore_last_displayed(Channel::Month).await?, None);
        Ok(())
    }
}
