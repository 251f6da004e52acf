use serde::{Deserialize, Serialize};

use crate::models::FetchMode;

/// One tracked storefront page. Loaded once at startup and referenced
/// read-only by the extraction components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,

    /// Primary CSS locator for the price element.
    pub locator: String,
    /// Fallback locator tried when the primary stops matching.
    #[serde(default)]
    pub backup_locator: Option<String>,

    #[serde(default)]
    pub mode: FetchMode,

    /// Politeness delay before this site when cycles run sequentially.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Page linked from alerts; falls back to `url` when absent.
    #[serde(default)]
    pub product_url: Option<String>,
}

fn default_wait_secs() -> u64 {
    3
}

impl SiteConfig {
    /// The backup locator, only when it is configured and actually different
    /// from the primary. A backup equal to the primary buys nothing.
    pub fn distinct_backup(&self) -> Option<&str> {
        self.backup_locator
            .as_deref()
            .filter(|backup| *backup != self.locator)
    }

    pub fn alert_url(&self) -> &str {
        self.product_url.as_deref().unwrap_or(&self.url)
    }
}
