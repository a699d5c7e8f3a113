use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{DisplayFromStr, serde_as};

use crate::quantity::cost::Cost;

/// Entity state as returned by `GET /api/states/<entity_id>`.
#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct EntityState {
    #[serde(rename = "state")]
    pub value: String,

    #[serde(rename = "last_changed")]
    pub last_changed_at: DateTime<Utc>,
}

impl EntityState {
    /// Raw state value, unless Home Assistant marks it as missing.
    pub fn available_value(&self) -> Option<&str> {
        match self.value.trim() {
            "" | "unknown" | "unavailable" => None,
            value => Some(value),
        }
    }
}

/// Request body of `POST /api/states/<entity_id>`.
#[must_use]
#[serde_as]
#[derive(Debug, Serialize)]
pub struct NewState {
    #[serde_as(as = "DisplayFromStr")]
    pub state: Cost,

    pub attributes: Map<String, Value>,
}
