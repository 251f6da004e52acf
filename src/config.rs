use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

use crate::models::SiteConfig;
use crate::parser::PriceBand;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub scraper: ScraperConfig,
    pub database: DatabaseConfig,
    pub notifications: NotificationsConfig,
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Price at or below which an alert fires.
    pub target_price: Decimal,
    pub refresh_interval_secs: u64,
    /// Capacity of the scheduler's result mailbox; oldest batches are
    /// dropped in favour of the newest when full.
    pub channel_capacity: usize,
    pub expected_price_min: Decimal,
    pub expected_price_max: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub user_agent: String,
    /// Timeout for a single static GET.
    pub request_timeout: u64,
    /// Hard per-site budget covering retrieval, fallback and parsing.
    pub site_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub max_concurrent_checks: usize,
    pub chrome_path: Option<String>,
    /// Settle delay after navigation before polling for the locator.
    pub settle_secs: u64,
    /// How long a rendered page gets to expose the primary locator.
    pub render_wait_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub to_address: Option<String>,
    pub use_tls: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Message(
                "At least one site must be configured".into(),
            ));
        }

        for site in &self.sites {
            if site.name.trim().is_empty() {
                return Err(ConfigError::Message("Site name cannot be empty".into()));
            }
            if Url::parse(&site.url).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid URL for site '{}': {}",
                    site.name, site.url
                )));
            }
            if site.locator.trim().is_empty() {
                return Err(ConfigError::Message(format!(
                    "Site '{}' needs a primary locator",
                    site.name
                )));
            }
        }

        if self.tracker.target_price <= Decimal::ZERO {
            return Err(ConfigError::Message(
                "Target price must be greater than 0".into(),
            ));
        }

        if self.tracker.refresh_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Refresh interval must be greater than 0".into(),
            ));
        }

        if self.tracker.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Channel capacity must be greater than 0".into(),
            ));
        }

        if self.tracker.expected_price_min >= self.tracker.expected_price_max {
            return Err(ConfigError::Message(
                "Expected price band must satisfy min < max".into(),
            ));
        }

        if self.scraper.max_concurrent_checks == 0 {
            return Err(ConfigError::Message(
                "Scraper max_concurrent_checks must be greater than 0".into(),
            ));
        }

        if self.scraper.site_timeout == 0 {
            return Err(ConfigError::Message(
                "Per-site timeout must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if self.notifications.smtp.port == 0 {
            return Err(ConfigError::Message(
                "SMTP port must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn price_band(&self) -> PriceBand {
        PriceBand {
            min: self.tracker.expected_price_min,
            max: self.tracker.expected_price_max,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.tracker.refresh_interval_secs)
    }

    pub fn site_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.site_timeout)
    }
}
