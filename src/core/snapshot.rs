use crate::{
    core::{fee::DEFAULT_BRACKET, source::ReadingSource},
    prelude::*,
    quantity::{energy::KilowattHours, parse_finite, price::KilowattHourPrice},
};

/// Entities polled on every cycle.
#[must_use]
#[derive(Clone, Debug)]
pub struct LiveEntities {
    pub price: String,
    pub usage: String,
    pub threshold: String,
}

/// Latest known live readings.
///
/// Never persisted: every cycle re-fetches each field and falls back to the cached value
/// when the new one is missing or unparsable.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveSnapshot {
    pub price: KilowattHourPrice,

    /// Energy used in the current hour so far.
    pub usage: KilowattHours,

    pub bracket: String,
}

impl Default for LiveSnapshot {
    fn default() -> Self {
        Self {
            price: KilowattHourPrice::ZERO,
            usage: KilowattHours::ZERO,
            bracket: DEFAULT_BRACKET.to_owned(),
        }
    }
}

impl LiveSnapshot {
    #[instrument(skip_all)]
    pub async fn refresh(&mut self, source: &dyn ReadingSource, entities: &LiveEntities) {
        if let Some(price) = fetch(source, &entities.price, KilowattHourPrice::parse_finite).await {
            self.price = price;
        }
        if let Some(usage) = fetch(source, &entities.usage, KilowattHours::parse_finite).await {
            self.usage = usage;
        }
        if let Some(bracket) = fetch(source, &entities.threshold, parse_bracket).await {
            self.bracket = bracket;
        }
        debug!(price = %self.price, usage = %self.usage, bracket = %self.bracket, "refreshed");
    }
}

async fn fetch<T>(
    source: &dyn ReadingSource,
    entity_id: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    match source.get_current(entity_id).await {
        Ok(Some(raw)) => {
            let value = parse(&raw);
            if value.is_none() {
                debug!(entity_id, %raw, "unparsable state, keeping the last known value");
            }
            value
        }
        Ok(None) => {
            debug!(entity_id, "state is unavailable, keeping the last known value");
            None
        }
        Err(error) => {
            warn!(entity_id, error = format!("{error:#}"), "failed to fetch the state");
            None
        }
    }
}

/// Parse the threshold bracket identifier.
///
/// Integral numbers are normalized, so that `10.0` selects the same bracket as `10`.
fn parse_bracket(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "unknown" || raw == "unavailable" {
        return None;
    }
    match parse_finite(raw) {
        Some(number) if number.fract() == 0.0 => Some(format!("{number:.0}")),
        _ => Some(raw.to_owned()),
    }
}
