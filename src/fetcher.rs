use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::extractor::SiteExtractor;
use crate::models::{FetchBatch, SiteConfig};
use crate::utils::error::{AppError, ExtractError};

/// One refresh cycle over the full site set. The scheduler talks to this
/// trait so it can be driven by test doubles.
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    async fn run_cycle(&self) -> Result<FetchBatch, AppError>;
}

pub struct FetchRunner {
    sites: Arc<Vec<SiteConfig>>,
    extractor: Arc<SiteExtractor>,
    site_timeout: Duration,
    max_concurrent: usize,
}

impl FetchRunner {
    pub fn new(
        sites: Arc<Vec<SiteConfig>>,
        extractor: Arc<SiteExtractor>,
        site_timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            sites,
            extractor,
            site_timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Extraction under the per-site budget. A slow or hanging site burns
    /// its own budget only; siblings keep running.
    async fn check_site(&self, site: &SiteConfig) -> Result<crate::models::PriceObservation, ExtractError> {
        match tokio::time::timeout(self.site_timeout, self.extractor.extract(site)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::DeadlineExceeded {
                budget_secs: self.site_timeout.as_secs(),
            }),
        }
    }

    async fn run_sequential(&self) -> Vec<(String, Result<crate::models::PriceObservation, ExtractError>)> {
        let mut results = Vec::with_capacity(self.sites.len());
        let last = self.sites.len() - 1;

        for (index, site) in self.sites.iter().enumerate() {
            results.push((site.name.clone(), self.check_site(site).await));

            // Politeness delay between sequential calls, skipped after the
            // final site.
            if index < last && site.wait_secs > 0 {
                tokio::time::sleep(Duration::from_secs(site.wait_secs)).await;
            }
        }

        results
    }

    async fn run_concurrent(&self) -> Vec<(String, Result<crate::models::PriceObservation, ExtractError>)> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let checks = self.sites.iter().map(|site| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let permit = semaphore.acquire().await;
                let result = match permit {
                    Ok(_permit) => self.check_site(site).await,
                    // The semaphore is never closed; record rather than panic
                    // if that ever changes.
                    Err(_) => Err(ExtractError::Fetch("worker pool unavailable".to_string())),
                };
                (site.name.clone(), result)
            }
        });

        join_all(checks).await
    }
}

#[async_trait]
impl CycleRunner for FetchRunner {
    async fn run_cycle(&self) -> Result<FetchBatch, AppError> {
        if self.sites.is_empty() {
            return Err(AppError::NoSitesConfigured);
        }

        let results = if self.max_concurrent > 1 {
            self.run_concurrent().await
        } else {
            self.run_sequential().await
        };

        let mut observations = Vec::new();
        let mut failures = HashMap::new();

        for (site, result) in results {
            match result {
                Ok(observation) => observations.push(observation),
                Err(e) => {
                    warn!(site = %site, "extraction failed: {}", e);
                    failures.insert(site, e.to_string());
                }
            }
        }

        let batch = FetchBatch::new(observations, failures);
        info!(
            succeeded = batch.success_count(),
            failed = batch.failure_count(),
            "refresh cycle complete"
        );

        Ok(batch)
    }
}
