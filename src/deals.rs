use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::models::{AlertDecision, AlertReason, FetchBatch, HistorySnapshot, SiteConfig};

/// Fraction of the historical low under which a price counts as a
/// significant drop.
const SIGNIFICANT_DROP_FACTOR: Decimal = Decimal::from_parts(9, 0, 0, false, 1);

/// Decides which observations in a batch merit an alert. Holds the site set
/// only to resolve product URLs; history and target come in per call.
pub struct DealEvaluator {
    sites: Arc<Vec<SiteConfig>>,
}

impl DealEvaluator {
    pub fn new(sites: Arc<Vec<SiteConfig>>) -> Self {
        Self { sites }
    }

    /// At most one decision per site per batch; a decision carries every
    /// qualifying reason at once.
    pub fn evaluate(
        &self,
        batch: &FetchBatch,
        history: &HistorySnapshot,
        target: Decimal,
    ) -> Vec<AlertDecision> {
        let mut decisions = Vec::new();

        for observation in &batch.observations {
            let mut reasons = Vec::new();

            if observation.price <= target {
                reasons.push(AlertReason::AtOrBelowTarget);
            }

            if history.is_new_low(observation.price) {
                reasons.push(AlertReason::NewHistoricalLow);
            }

            if let Some(min) = history.global_min {
                if observation.price < min * SIGNIFICANT_DROP_FACTOR {
                    reasons.push(AlertReason::SignificantDrop);
                }
            }

            if reasons.is_empty() {
                continue;
            }

            debug!(
                site = %observation.site,
                price = %observation.price,
                "deal qualifies: {}",
                reasons
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            decisions.push(AlertDecision {
                site: observation.site.clone(),
                price: observation.price,
                reasons,
                historical_min: history.global_min,
                product_url: self.resolve_product_url(&observation.site),
            });
        }

        decisions
    }

    fn resolve_product_url(&self, site: &str) -> String {
        self.sites
            .iter()
            .find(|s| s.name == site)
            .map(|s| s.alert_url().to_string())
            .unwrap_or_default()
    }
}
