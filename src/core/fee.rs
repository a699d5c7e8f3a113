use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::quantity::cost::Cost;

/// Bracket reported when the threshold sensor has never been seen.
pub const DEFAULT_BRACKET: &str = "0";

/// Monthly capacity fee per power threshold bracket.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::IntoIterator)]
pub struct BracketFeeTable(#[into_iterator(owned, ref)] BTreeMap<String, Cost>);

impl Default for BracketFeeTable {
    fn default() -> Self {
        Self(BTreeMap::from([
            ("5".to_owned(), Cost(160.0)),
            ("10".to_owned(), Cost(395.0)),
            ("15".to_owned(), Cost(656.0)),
            ("20".to_owned(), Cost(923.0)),
        ]))
    }
}

impl BracketFeeTable {
    /// Default table with the specified brackets replaced or added.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (String, Cost)>) -> Self {
        let mut this = Self::default();
        this.0.extend(overrides);
        this
    }

    /// Monthly fee of the bracket, zero for an unknown one.
    pub fn monthly_fee(&self, bracket: &str) -> Cost {
        self.0.get(bracket.trim()).copied().unwrap_or(Cost::ZERO)
    }
}
