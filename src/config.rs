use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    core::{engine::Settings, fee::BracketFeeTable, snapshot::LiveEntities},
    prelude::*,
    quantity::cost::Cost,
};

/// Identifier of a configured instance, also used in the output entity IDs.
#[derive(
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Contents of the instances file.
#[must_use]
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// One configured cost tracker.
#[must_use]
#[derive(Clone, Debug, Deserialize)]
pub struct InstanceConfig {
    pub id: InstanceId,

    /// Cumulative energy counter (TPI) in kilowatt-hours.
    pub counter_entity_id: String,

    /// Energy used in the current hour.
    pub usage_entity_id: String,

    /// Current unit price.
    pub price_entity_id: String,

    /// Active power threshold bracket.
    pub threshold_entity_id: String,

    #[serde(default = "InstanceConfig::default_currency")]
    pub currency: String,

    /// Monthly fee overrides keyed by the bracket.
    #[serde(default)]
    pub fees: BTreeMap<String, Cost>,
}

impl Config {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let this = Self::parse(&contents)
            .with_context(|| format!("invalid instances file `{}`", path.display()))?;
        info!(n_instances = this.instances.len(), "loaded the configuration");
        Ok(this)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let this: Self = toml::from_str(contents)?;
        this.validate()?;
        Ok(this)
    }

    pub fn get(&self, id: &InstanceId) -> Option<&InstanceConfig> {
        self.instances.iter().find(|instance| &instance.id == id)
    }

    fn validate(&self) -> Result {
        let mut ids = HashSet::new();
        for instance in &self.instances {
            instance.validate().with_context(|| format!("instance `{}`", instance.id))?;
            ensure!(ids.insert(&instance.id), "duplicate instance ID `{}`", instance.id);
        }
        Ok(())
    }
}

impl InstanceConfig {
    fn default_currency() -> String {
        "NOK".to_owned()
    }

    fn validate(&self) -> Result {
        ensure!(!self.id.as_str().is_empty(), "instance ID must not be empty");
        ensure!(
            self.id.as_str().chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_')),
            "instance ID may only contain lowercase letters, digits, and underscores",
        );
        for (name, entity_id) in [
            ("counter", &self.counter_entity_id),
            ("usage", &self.usage_entity_id),
            ("price", &self.price_entity_id),
            ("threshold", &self.threshold_entity_id),
        ] {
            ensure!(!entity_id.trim().is_empty(), "{name} entity ID must not be empty");
        }
        ensure!(!self.currency.trim().is_empty(), "currency must not be empty");
        for (bracket, fee) in &self.fees {
            ensure!(
                fee.0.is_finite() && *fee >= Cost::ZERO,
                "fee of bracket `{bracket}` must be a non-negative number",
            );
        }
        Ok(())
    }

    pub fn fee_table(&self) -> BracketFeeTable {
        BracketFeeTable::with_overrides(self.fees.clone())
    }

    pub fn settings(&self) -> Settings {
        Settings::builder()
            .entities(LiveEntities {
                price: self.price_entity_id.clone(),
                usage: self.usage_entity_id.clone(),
                threshold: self.threshold_entity_id.clone(),
            })
            .fees(self.fee_table())
            .currency(self.currency.clone())
            .build()
    }
}
