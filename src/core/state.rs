use serde::{Deserialize, Serialize};

use crate::{
    core::period::PeriodKeys,
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, price::KilowattHourPrice},
};

/// Largest counter increase between two readings that is still believed to be real consumption.
pub const MAX_DELTA: KilowattHours = KilowattHours(10.0);

/// Accumulator state preserved between the application runs.
#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineState {
    /// Last accepted cumulative counter value.
    pub previous_counter: Option<KilowattHours>,

    /// Energy-only cost since the last day boundary.
    pub day_energy_cost: Cost,

    /// Energy-only cost since the last month boundary.
    pub month_energy_cost: Cost,

    pub current_day_key: Option<String>,

    pub current_month_key: Option<String>,
}

/// Which running totals were reset by [`EngineState::roll_over`].
#[must_use]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Rollover {
    pub day: bool,
    pub month: bool,
}

impl EngineState {
    /// Reset the totals whose period key changed and adopt the new keys.
    pub fn roll_over(&mut self, keys: &PeriodKeys) -> Rollover {
        let mut rollover = Rollover::default();
        if self.current_day_key.as_deref() != Some(keys.day.as_str()) {
            self.day_energy_cost = Cost::ZERO;
            self.current_day_key = Some(keys.day.clone());
            rollover.day = true;
        }
        if self.current_month_key.as_deref() != Some(keys.month.as_str()) {
            self.month_energy_cost = Cost::ZERO;
            self.current_month_key = Some(keys.month.clone());
            rollover.month = true;
        }
        rollover
    }

    /// Move the baseline to the new counter reading and return the accepted energy delta.
    ///
    /// The very first reading only establishes the baseline. A delta outside `0..=MAX_DELTA`
    /// contributes nothing, but the baseline still moves so that one bad sample does not
    /// desynchronize the following ones.
    pub fn advance_counter(&mut self, counter: KilowattHours) -> KilowattHours {
        let Some(previous_counter) = self.previous_counter.replace(counter) else {
            info!(%counter, "first counter reading, establishing the baseline");
            return KilowattHours::ZERO;
        };
        let delta = counter - previous_counter;
        if (KilowattHours::ZERO..=MAX_DELTA).contains(&delta) {
            delta
        } else {
            warn!(%previous_counter, %counter, ?delta, "rejecting an out-of-bounds counter delta");
            KilowattHours::ZERO
        }
    }

    /// Add the energy cost to both running totals and return the added cost.
    pub fn accrue(&mut self, delta: KilowattHours, price: KilowattHourPrice) -> Cost {
        if delta <= KilowattHours::ZERO || price <= KilowattHourPrice::ZERO {
            return Cost::ZERO;
        }
        let added_cost = delta * price;
        self.day_energy_cost += added_cost;
        self.month_energy_cost += added_cost;
        added_cost
    }
}
