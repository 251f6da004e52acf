use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::models::{HistorySnapshot, PriceObservation};
use crate::utils::error::AppError;

/// Persistence boundary. The core only ever appends observations and reads
/// back a snapshot; it never touches the storage format itself.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn append(&self, observation: &PriceObservation) -> Result<(), AppError>;
    async fn load_history(&self) -> Result<HistorySnapshot, AppError>;
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS observations (
                id TEXT PRIMARY KEY,
                site TEXT NOT NULL,
                price TEXT NOT NULL,
                observed_at TEXT NOT NULL,
                locator TEXT NOT NULL,
                mode TEXT NOT NULL,
                in_expected_band INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_observations_site_time
             ON observations (site, observed_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PriceStore for SqliteStore {
    async fn append(&self, observation: &PriceObservation) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO observations (id, site, price, observed_at, locator, mode, in_expected_band)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&observation.id)
        .bind(&observation.site)
        // Prices are stored as text so Decimal survives the round trip
        // exactly; aggregation happens in Rust, not SQL.
        .bind(observation.price.to_string())
        .bind(observation.observed_at)
        .bind(observation.locator.to_string())
        .bind(observation.mode.to_string())
        .bind(observation.in_expected_band)
        .execute(&self.pool)
        .await?;

        debug!(site = %observation.site, price = %observation.price, "observation persisted");
        Ok(())
    }

    async fn load_history(&self) -> Result<HistorySnapshot, AppError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT site, price FROM observations ORDER BY observed_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut global_min: Option<Decimal> = None;
        let mut latest: HashMap<String, Decimal> = HashMap::new();

        for (site, price_text) in rows {
            let price = Decimal::from_str(&price_text).map_err(|e| {
                AppError::Internal(format!("corrupt price '{}' for {}: {}", price_text, site, e))
            })?;

            global_min = Some(match global_min {
                Some(min) if min <= price => min,
                _ => price,
            });
            latest.insert(site, price);
        }

        Ok(HistorySnapshot { global_min, latest })
    }
}
