use std::{sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    api::home_assistant::Sensors,
    cli::{InstancesArgs, StateArgs, home_assistant::HomeAssistantConnectionArgs},
    coordinator::{Adapters, Coordinator},
    core::sink::OutputSink,
    prelude::*,
    sink::TracingSink,
};

#[derive(Parser)]
pub struct RunArgs {
    #[clap(flatten)]
    pub connection: HomeAssistantConnectionArgs,

    #[clap(flatten)]
    pub instances: InstancesArgs,

    #[clap(flatten)]
    pub state: StateArgs,

    /// How often the counter entities are polled.
    #[clap(long, env = "POLLING_INTERVAL", default_value = "10s")]
    pub polling_interval: humantime::Duration,

    /// Log the costs instead of publishing them to Home Assistant.
    #[clap(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn polling_interval(&self) -> Duration {
        self.polling_interval.into()
    }

    pub async fn run(self) -> Result {
        let config = self.instances.read()?;
        ensure!(!config.instances.is_empty(), "no instances configured");

        let api = Arc::new(
            self.connection.try_new_client()?.with_polling_interval(self.polling_interval()),
        );
        let mut coordinator = Coordinator::default();
        for instance in &config.instances {
            let sink: Arc<dyn OutputSink> = if self.dry_run {
                Arc::new(TracingSink::new(instance.id.clone()))
            } else {
                Arc::new(Sensors::new(api.as_ref().clone(), instance.id.clone()))
            };
            let adapters = Adapters {
                source: api.clone(),
                store: Arc::new(self.state.store(&instance.id)),
                sink,
            };
            coordinator
                .start(instance.id.clone(), instance.settings(), &instance.counter_entity_id, adapters)
                .await?;
        }
        info!(dry_run = self.dry_run, "running, press Ctrl-C to stop…");

        tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
        coordinator.shutdown().await
    }
}
