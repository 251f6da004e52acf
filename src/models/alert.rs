use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Why an observation qualified for an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    AtOrBelowTarget,
    NewHistoricalLow,
    SignificantDrop,
}

impl std::fmt::Display for AlertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertReason::AtOrBelowTarget => write!(f, "at or below target"),
            AlertReason::NewHistoricalLow => write!(f, "new historical low"),
            AlertReason::SignificantDrop => write!(f, "dropped more than 10% below the historical low"),
        }
    }
}

/// One qualifying observation, ready for the notifier. At most one per site
/// per batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertDecision {
    pub site: String,
    pub price: Decimal,
    pub reasons: Vec<AlertReason>,
    /// Historical low the comparison ran against; None on an empty history.
    pub historical_min: Option<Decimal>,
    pub product_url: String,
}

impl AlertDecision {
    pub fn reasons_joined(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
