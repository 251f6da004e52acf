use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{generate_id, FetchMode, LocatorSource};

/// One successfully extracted price. Created once per extraction, immutable
/// afterwards; the store appends these one by one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceObservation {
    pub id: String,
    pub site: String,
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
    pub locator: LocatorSource,
    pub mode: FetchMode,
    /// Soft plausibility flag: false means the price fell outside the
    /// configured expected band and was logged as suspicious, not rejected.
    pub in_expected_band: bool,
}

impl PriceObservation {
    pub fn new(
        site: &str,
        price: Decimal,
        locator: LocatorSource,
        mode: FetchMode,
        in_expected_band: bool,
    ) -> Self {
        Self {
            id: generate_id(),
            site: site.to_string(),
            price,
            observed_at: Utc::now(),
            locator,
            mode,
            in_expected_band,
        }
    }
}
