use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only view over the persisted observation history. Built by the
/// store; the core only compares against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySnapshot {
    /// Minimum price ever observed across all sites. None on an empty
    /// history, which comparisons treat as +∞ so the first observation
    /// never counts as a new low.
    pub global_min: Option<Decimal>,
    /// Most recent price per site.
    pub latest: HashMap<String, Decimal>,
}

impl HistorySnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.global_min.is_none()
    }

    pub fn is_new_low(&self, price: Decimal) -> bool {
        match self.global_min {
            Some(min) => price < min,
            None => false,
        }
    }

    pub fn latest_for(&self, site: &str) -> Option<Decimal> {
        self.latest.get(site).copied()
    }
}
