use async_trait::async_trait;
use serde_json::Value;

use crate::{
    api::home_assistant::{Api, EntityState, NewState},
    config::InstanceId,
    core::{
        output::{Channel, OutputRecord},
        sink::OutputSink,
    },
    prelude::*,
    quantity::cost::Cost,
};

/// Output sensors of a single instance in Home Assistant.
#[must_use]
pub struct Sensors {
    api: Api,
    instance_id: InstanceId,
}

impl Sensors {
    pub const fn new(api: Api, instance_id: InstanceId) -> Self {
        Self { api, instance_id }
    }

    pub fn entity_id(&self, channel: Channel) -> String {
        format!("sensor.{}_{}", self.instance_id, channel.suffix())
    }
}

#[async_trait]
impl OutputSink for Sensors {
    async fn publish(&self, channel: Channel, record: &OutputRecord) -> Result {
        let mut attributes = record.attributes.clone();
        attributes.insert("unit_of_measurement".to_owned(), Value::from(record.unit.as_str()));
        attributes.insert("friendly_name".to_owned(), Value::from(channel.friendly_name()));
        attributes.insert("device_class".to_owned(), Value::from("monetary"));
        attributes.insert("icon".to_owned(), Value::from("mdi:cash"));
        let new_state = NewState { state: record.value, attributes };
        self.api.set_state(&self.entity_id(channel), &new_state).await
    }

    async fn restore_last_displayed(&self, channel: Channel) -> Result<Option<Cost>> {
        Ok(self
            .api
            .get_state(&self.entity_id(channel))
            .await?
            .as_ref()
            .and_then(EntityState::available_value)
            .and_then(Cost::parse_finite))
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::{Map, json};

    use super::*;

    fn sensors(server: &Server) -> Result<Sensors> {
        let api = Api::try_new("test_token", format!("{}/api", server.url()).parse()?)?;
        Ok(Sensors::new(api, InstanceId::from("home")))
    }

    #[tokio::test]
    async fn test_publish() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/states/sensor.home_cost_today")
            .match_header("authorization", "Bearer test_token")
            .match_body(Matcher::PartialJson(json!({
                "state": "18.17",
                "attributes": {
                    "unit_of_measurement": "NOK",
                    "friendly_name": "Cost today",
                    "device_class": "monetary",
                    "days_in_month": 30,
                },
            })))
            .with_status(200)
            .create_async()
            .await;

        let record = OutputRecord {
            value: Cost(18.17),
            unit: "NOK".to_owned(),
            attributes: Map::from_iter([("days_in_month".to_owned(), json!(30))]),
        };
        sensors(&server)?.publish(Channel::Today, &record).await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_rejected() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/states/sensor.home_cost_hour")
            .with_status(401)
            .create_async()
            .await;
        let record = OutputRecord::restored(Cost(1.0), "NOK");
        assert!(sensors(&server)?.publish(Channel::Hour, &record).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_last_displayed() -> Result {
        let mut server = Server::new_async().await;
        let _month = server
            .mock("GET", "/api/states/sensor.home_cost_month")
            .with_status(200)
            .with_body(
                json!({
                    "entity_id": "sensor.home_cost_month",
                    "state": "812.34",
                    "attributes": {},
                    "last_changed": "2025-10-02T10:00:00Z",
                    "last_updated": "2025-10-02T10:00:00Z",
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _hour = server
            .mock("GET", "/api/states/sensor.home_cost_hour")
            .with_status(200)
            .with_body(
                json!({
                    "entity_id": "sensor.home_cost_hour",
                    "state": "unknown",
                    "attributes": {},
                    "last_changed": "2025-10-02T10:00:00Z",
                    "last_updated": "2025-10-02T10:00:00Z",
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _today = server
            .mock("GET", "/api/states/sensor.home_cost_today")
            .with_status(404)
            .create_async()
            .await;

        let sensors = sensors(&server)?;
        assert_eq!(sensors.restore_last_displayed(Channel::Month).await?, Some(Cost(812.34)));
        assert_eq!(sensors.restore_last_displayed(Channel::Hour).await?, None);
        assert_eq!(sensors.restore_last_displayed(Channel::Today).await?, None);
        Ok(())
    }
}
