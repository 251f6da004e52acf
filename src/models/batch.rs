use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::PriceObservation;

/// Aggregated result of one refresh cycle across all configured sites.
/// Holds at most one observation per site; failures are recorded per site
/// and never abort the cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchBatch {
    pub observations: Vec<PriceObservation>,
    pub failures: HashMap<String, String>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchBatch {
    pub fn new(
        observations: Vec<PriceObservation>,
        failures: HashMap<String, String>,
    ) -> Self {
        debug_assert!(
            {
                let mut sites: Vec<_> = observations.iter().map(|o| o.site.as_str()).collect();
                sites.sort_unstable();
                sites.windows(2).all(|w| w[0] != w[1])
            },
            "a batch must hold at most one observation per site"
        );

        Self {
            observations,
            failures,
            // "As of" time for the whole cycle, assigned after all sites
            // resolved.
            fetched_at: Utc::now(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.observations.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn contains_site(&self, site: &str) -> bool {
        self.observations.iter().any(|o| o.site == site)
    }

    /// Cheapest observation in the batch, if any succeeded.
    pub fn best(&self) -> Option<&PriceObservation> {
        self.observations.iter().min_by_key(|o| o.price)
    }
}
