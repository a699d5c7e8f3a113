use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{Instrument, info_span};

use crate::{
    config::InstanceId,
    core::{
        engine::{AccumulationEngine, Settings},
        output::{Channel, OutputRecord},
        sink::OutputSink,
        source::{ReadingSource, Subscription},
        store::StateStore,
    },
    prelude::*,
    store::QueuedStore,
};

/// External collaborators of a single instance.
pub struct Adapters {
    pub source: Arc<dyn ReadingSource>,

    /// Durable store, the coordinator puts its own write queue in front of it.
    pub store: Arc<dyn StateStore>,

    pub sink: Arc<dyn OutputSink>,
}

/// Running instances keyed by their IDs.
///
/// Each instance is driven by its own task which owns the engine, so the readings of one
/// instance are applied strictly one after another and the instances never share state.
#[must_use]
#[derive(Default)]
pub struct Coordinator {
    instances: HashMap<InstanceId, Instance>,
}

struct Instance {
    shutdown: oneshot::Sender<()>,
    actor: JoinHandle<()>,
    store: Arc<QueuedStore>,
}

impl Coordinator {
    pub fn is_running(&self, id: &InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Restore the displayed values, initialize the engine, and start following the counter.
    #[instrument(skip_all, fields(instance = %id))]
    pub async fn start(
        &mut self,
        id: InstanceId,
        settings: Settings,
        counter_entity_id: &str,
        adapters: Adapters,
    ) -> Result {
        ensure!(!self.is_running(&id), "instance `{id}` is already running");
        info!(counter_entity_id, "starting…");

        restore_last_displayed(adapters.sink.as_ref(), &settings.currency).await;

        let store = Arc::new(QueuedStore::spawn(adapters.store));
        let mut engine =
            AccumulationEngine::new(settings, adapters.source.clone(), store.clone(), adapters.sink);
        let _ = engine.initialize(Utc::now()).await;

        let subscription = adapters.source.subscribe(counter_entity_id);
        let (shutdown, shutdown_receiver) = oneshot::channel();
        let actor = tokio::spawn(
            follow(engine, subscription, shutdown_receiver)
                .instrument(info_span!("instance", id = %id)),
        );
        self.instances.insert(id, Instance { shutdown, actor, store });
        Ok(())
    }

    /// Stop following the counter and wait for the pending state to be written.
    ///
    /// Returns `false` if the instance was not running.
    #[instrument(skip_all, fields(instance = %id))]
    pub async fn stop(&mut self, id: &InstanceId) -> Result<bool> {
        let Some(instance) = self.instances.remove(id) else {
            return Ok(false);
        };
        instance.stop().await?;
        info!("stopped");
        Ok(true)
    }

    /// Stop all the instances.
    pub async fn shutdown(&mut self) -> Result {
        info!(n_instances = self.instances.len(), "shutting down…");
        let ids: Vec<InstanceId> = self.instances.keys().cloned().collect();
        for id in ids {
            self.stop(&id).await.with_context(|| format!("failed to stop `{id}`"))?;
        }
        Ok(())
    }
}

impl Instance {
    async fn stop(self) -> Result {
        let _ = self.shutdown.send(());
        self.actor.await.context("the instance task has failed")?;
        self.store.flush().await
    }
}

/// Put the values from before the restart back on display until the first computation.
async fn restore_last_displayed(sink: &dyn OutputSink, currency: &str) {
    for channel in Channel::ALL {
        let value = match sink.restore_last_displayed(channel).await {
            Ok(Some(value)) => value,
            Ok(None) => continue,
            Err(error) => {
                warn!(?channel, error = format!("{error:#}"), "failed to restore the last value");
                continue;
            }
        };
        debug!(?channel, %value, "restoring…");
        if let Err(error) = sink.publish(channel, &OutputRecord::restored(value, currency)).await {
            warn!(?channel, error = format!("{error:#}"), "failed to re-publish the last value");
        }
    }
}

async fn follow(
    mut engine: AccumulationEngine,
    mut subscription: Subscription,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("shutdown requested");
                break;
            }
            reading = subscription.next() => {
                let Some(raw) = reading else {
                    warn!("the counter subscription has ended");
                    break;
                };
                let _ = engine.on_counter_reading(&raw, Utc::now()).await;
            }
        }
    }
}
