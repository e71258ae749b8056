use serde::{Deserialize, Serialize};

use crate::contract::Invariant;

/// Generated harness source for one invariant.
///
/// Immutable once built. Persisting it to disk is a separate step owned by
/// the campaign workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessUnit {
    pub invariant: Invariant,
    /// Harness contract the engine is pointed at.
    pub contract_name: String,
    /// Property function the harness declares.
    pub property_name: String,
    pub source: String,
}

impl HarnessUnit {
    pub fn new(invariant: Invariant, source: impl Into<String>) -> Self {
        Self {
            contract_name: invariant.harness_contract(),
            property_name: invariant.property_name(),
            invariant,
            source: source.into(),
        }
    }

    pub fn index(&self) -> usize {
        self.invariant.position()
    }
}
