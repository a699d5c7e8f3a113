use std::sync::Arc;

use bon::Builder;
use chrono::{DateTime, Utc};

use crate::{
    core::{
        fee::BracketFeeTable,
        output::{Breakdown, Channel},
        period::PeriodKeys,
        sink::OutputSink,
        snapshot::{LiveEntities, LiveSnapshot},
        source::ReadingSource,
        state::EngineState,
        store::StateStore,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// Immutable per-instance settings of the engine.
#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct Settings {
    pub entities: LiveEntities,

    #[builder(default)]
    pub fees: BracketFeeTable,

    #[builder(into)]
    pub currency: String,
}

/// Turns counter readings into the running hour, day, and month costs.
///
/// Not synchronized: the owner must feed the readings one at a time.
pub struct AccumulationEngine {
    settings: Settings,
    state: EngineState,
    snapshot: LiveSnapshot,
    is_loaded: bool,
    source: Arc<dyn ReadingSource>,
    store: Arc<dyn StateStore>,
    sink: Arc<dyn OutputSink>,
}

impl AccumulationEngine {
    pub fn new(
        settings: Settings,
        source: Arc<dyn ReadingSource>,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            settings,
            state: EngineState::default(),
            snapshot: LiveSnapshot::default(),
            is_loaded: false,
            source,
            store,
            sink,
        }
    }

    #[cfg(test)]
    pub const fn state(&self) -> &EngineState {
        &self.state
    }

    /// Restore the persisted state and publish the baseline outputs without accruing anything.
    ///
    /// Calling it again only refreshes the outputs: the in-memory state stays authoritative
    /// once loaded.
    ///
    /// Periods are not rolled over here, so a state saved yesterday keeps showing yesterday's
    /// totals until the first counter reading.
    #[instrument(skip_all)]
    pub async fn initialize(&mut self, now: DateTime<Utc>) -> Breakdown {
        if !self.is_loaded {
            self.state = match self.store.load().await {
                Ok(Some(state)) => {
                    info!(?state, "restored the state");
                    state
                }
                Ok(None) => {
                    info!("no saved state, starting fresh");
                    EngineState::default()
                }
                Err(error) => {
                    warn!(error = format!("{error:#}"), "failed to load the state, starting fresh");
                    EngineState::default()
                }
            };
            self.is_loaded = true;
        }
        self.compute_cycle(KilowattHours::ZERO, None, now).await
    }

    /// Apply a new raw counter reading.
    ///
    /// Returns [`None`] when the reading is not a number, in which case nothing changes.
    #[instrument(skip_all, fields(raw = raw))]
    pub async fn on_counter_reading(&mut self, raw: &str, now: DateTime<Utc>) -> Option<Breakdown> {
        let Some(counter) = KilowattHours::parse_finite(raw) else {
            debug!("ignoring an unparsable counter reading");
            return None;
        };
        let rollover = self.state.roll_over(&PeriodKeys::at(now));
        if rollover.day || rollover.month {
            info!(day = rollover.day, month = rollover.month, "period boundary crossed");
        }
        let delta = self.state.advance_counter(counter);
        Some(self.compute_cycle(delta, Some(counter), now).await)
    }

    #[instrument(skip_all, fields(delta = %delta, counter = ?counter))]
    async fn compute_cycle(
        &mut self,
        delta: KilowattHours,
        counter: Option<KilowattHours>,
        now: DateTime<Utc>,
    ) -> Breakdown {
        self.snapshot.refresh(self.source.as_ref(), &self.settings.entities).await;
        let added_cost = self.state.accrue(delta, self.snapshot.price);
        let breakdown = Breakdown::compute(&self.state, &self.snapshot, &self.settings.fees, now);
        info!(
            %added_cost,
            hour = %breakdown.hour,
            today = %breakdown.today,
            month = %breakdown.month,
            "computed",
        );
        self.publish(&breakdown).await;
        if let Err(error) = self.store.save(&self.state).await {
            error!(error = format!("{error:#}"), "failed to save the state");
        }
        breakdown
    }

    async fn publish(&self, breakdown: &Breakdown) {
        for channel in Channel::ALL {
            let result = match breakdown.record(channel, &self.settings.currency) {
                Ok(record) => self.sink.publish(channel, &record).await,
                Err(error) => Err(error),
            };
            if let Err(error) = result {
                error!(?channel, error = format!("{error:#}"), "failed to publish");
            }
        }
    }
}
