use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    core::{
        fee::BracketFeeTable,
        period::{days_in_month, days_in_month_of},
        snapshot::LiveSnapshot,
        state::EngineState,
    },
    prelude::*,
    quantity::{cost::Cost, energy::KilowattHours, price::KilowattHourPrice},
};

/// Published cost reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Channel {
    /// Instantaneous estimate for the current hour.
    Hour,

    /// Energy cost since midnight plus the daily share of the capacity fee.
    Today,

    /// Energy cost since the month start plus the full capacity fee.
    Month,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Hour, Self::Today, Self::Month];

    /// Stable suffix used to build the output entity ID.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Hour => "cost_hour",
            Self::Today => "cost_today",
            Self::Month => "cost_month",
        }
    }

    pub const fn friendly_name(self) -> &'static str {
        match self {
            Self::Hour => "Cost this hour",
            Self::Today => "Cost today",
            Self::Month => "Cost this month",
        }
    }
}

/// Value pushed to an [`OutputSink`][crate::core::sink::OutputSink].
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRecord {
    /// Rounded to cents.
    pub value: Cost,

    /// Currency code.
    pub unit: String,

    pub attributes: Map<String, Value>,
}

impl OutputRecord {
    /// Record carrying a value restored from the sink's own memory.
    pub fn restored(value: Cost, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            attributes: Map::from_iter([("restored".to_owned(), Value::Bool(true))]),
        }
    }
}

/// Everything computed in a single cycle.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breakdown {
    pub price: KilowattHourPrice,
    pub usage: KilowattHours,
    pub bracket: String,
    pub monthly_fee: Cost,
    pub days_in_month: u32,
    pub day_fee_share: Cost,
    pub day_energy_cost: Cost,
    pub month_energy_cost: Cost,
    pub hour: Cost,
    pub today: Cost,
    pub month: Cost,
}

impl Breakdown {
    /// Combine the accumulated state with the live readings.
    ///
    /// The month length follows the state's month key, so that a restored state from a previous
    /// month is still pro-rated over its own month.
    pub fn compute(
        state: &EngineState,
        snapshot: &LiveSnapshot,
        fees: &BracketFeeTable,
        now: DateTime<Utc>,
    ) -> Self {
        let monthly_fee = fees.monthly_fee(&snapshot.bracket);
        let days_in_month = state
            .current_month_key
            .as_deref()
            .and_then(days_in_month)
            .unwrap_or_else(|| days_in_month_of(now.date_naive()));
        let day_fee_share =
            if days_in_month == 0 { Cost::ZERO } else { monthly_fee / days_in_month };
        let hour = snapshot.usage.non_negative() * snapshot.price.non_negative();
        Self {
            price: snapshot.price,
            usage: snapshot.usage,
            bracket: snapshot.bracket.clone(),
            monthly_fee,
            days_in_month,
            day_fee_share,
            day_energy_cost: state.day_energy_cost,
            month_energy_cost: state.month_energy_cost,
            hour,
            today: state.day_energy_cost + day_fee_share,
            month: state.month_energy_cost + monthly_fee,
        }
    }

    pub fn record(&self, channel: Channel, currency: &str) -> Result<OutputRecord> {
        let (value, attributes) = match channel {
            Channel::Hour => (
                self.hour,
                serde_json::to_value(HourAttributes {
                    price_per_kwh: self.price.round_to(4).0,
                    usage_kwh: self.usage.round_to(3).0,
                    bracket: &self.bracket,
                    monthly_fee: self.monthly_fee.0,
                })?,
            ),
            Channel::Today => (
                self.today,
                serde_json::to_value(TodayAttributes {
                    energy_cost: self.day_energy_cost.round_to_cents().0,
                    day_fee_share: self.day_fee_share.round_to_cents().0,
                    price_per_kwh: self.price.round_to(4).0,
                    bracket: &self.bracket,
                    monthly_fee: self.monthly_fee.0,
                    days_in_month: self.days_in_month,
                })?,
            ),
            Channel::Month => (
                self.month,
                serde_json::to_value(MonthAttributes {
                    energy_cost: self.month_energy_cost.round_to_cents().0,
                    price_per_kwh: self.price.round_to(4).0,
                    bracket: &self.bracket,
                    monthly_fee: self.monthly_fee.0,
                })?,
            ),
        };
        let Value::Object(attributes) = attributes else {
            bail!("attributes of `{channel:?}` did not serialize into an object");
        };
        Ok(OutputRecord { value: value.round_to_cents(), unit: currency.to_owned(), attributes })
    }
}

#[derive(Serialize)]
struct HourAttributes<'a> {
    price_per_kwh: f64,
    usage_kwh: f64,
    bracket: &'a str,
    monthly_fee: f64,
}

#[derive(Serialize)]
struct TodayAttributes<'a> {
    energy_cost: f64,
    day_fee_share: f64,
    price_per_kwh: f64,
    bracket: &'a str,
    monthly_fee: f64,
    days_in_month: u32,
}

#[derive(Serialize)]
struct MonthAttributes<'a> {
    energy_cost: f64,
    price_per_kwh: f64,
    bracket: &'a str,
    monthly_fee: f64,
}
