mod sensors;
mod state;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client,
    ClientBuilder,
    StatusCode,
    Url,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};

pub use self::{
    sensors::Sensors,
    state::{EntityState, NewState},
};
use crate::{
    core::source::{ReadingSource, Subscription},
    prelude::*,
};

/// Home Assistant REST API client.
#[must_use]
#[derive(Clone)]
pub struct Api {
    client: Client,
    base_url: Url,
    polling_interval: Duration,
}

impl Api {
    pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(10);

    /// Build the client. The base URL includes the `/api` path, for example: `http://localhost:8123/api`.
    pub fn try_new(access_token: &str, base_url: Url) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {access_token}"))?,
        )]);
        let client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, base_url, polling_interval: Self::DEFAULT_POLLING_INTERVAL })
    }

    pub const fn with_polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval;
        self
    }

    fn state_url(&self, entity_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("invalid base URL"))?
            .pop_if_empty()
            .push("states")
            .push(entity_id);
        Ok(url)
    }

    /// Fetch the entity state, [`None`] if the entity does not exist.
    #[instrument(skip_all, fields(entity_id = entity_id))]
    pub async fn get_state(&self, entity_id: &str) -> Result<Option<EntityState>> {
        let response = self
            .client
            .get(self.state_url(entity_id)?)
            .send()
            .await
            .with_context(|| format!("failed to request the state of `{entity_id}`"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let state = response
            .error_for_status()?
            .json::<EntityState>()
            .await
            .with_context(|| format!("failed to deserialize the state of `{entity_id}`"))?;
        trace!(value = %state.value, "fetched");
        Ok(Some(state))
    }

    #[instrument(skip_all, fields(entity_id = entity_id, state = %new_state.state))]
    pub async fn set_state(&self, entity_id: &str, new_state: &NewState) -> Result {
        self.client
            .post(self.state_url(entity_id)?)
            .json(new_state)
            .send()
            .await
            .with_context(|| format!("failed to set the state of `{entity_id}`"))?
            .error_for_status()?;
        debug!("published");
        Ok(())
    }

    /// Poll the entity and forward its state whenever it changes.
    #[instrument(skip_all, fields(entity_id = %entity_id))]
    async fn watch(self, entity_id: String, sender: mpsc::Sender<String>) {
        info!(polling_interval = ?self.polling_interval, "watching…");
        let mut interval = interval(self.polling_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<(String, DateTime<Utc>)> = None;

        loop {
            interval.tick().await;
            let state = match self.get_state(&entity_id).await {
                Ok(Some(state)) => state,
                Ok(None) => {
                    debug!("the entity does not exist (yet)");
                    continue;
                }
                Err(error) => {
                    warn!(error = format!("{error:#}"), "failed to poll the entity");
                    continue;
                }
            };
            let marker = (state.value, state.last_changed_at);
            if last_seen.as_ref() == Some(&marker) {
                continue;
            }
            if sender.send(marker.0.clone()).await.is_err() {
                debug!("the subscriber has gone");
                break;
            }
            last_seen = Some(marker);
        }
    }
}

#[async_trait]
impl ReadingSource for Api {
    async fn get_current(&self, entity_id: &str) -> Result<Option<String>> {
        Ok(self
            .get_state(entity_id)
            .await?
            .as_ref()
            .and_then(EntityState::available_value)
            .map(str::to_owned))
    }

    fn subscribe(&self, entity_id: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(16);
        let watcher = tokio::spawn(self.clone().watch(entity_id.to_owned(), sender));
        Subscription::new(receiver, Some(watcher))
    }
}
