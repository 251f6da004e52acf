use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use pricewatch::config::AppConfig;
use pricewatch::deals::DealEvaluator;
use pricewatch::extractor::SiteExtractor;
use pricewatch::fetcher::FetchRunner;
use pricewatch::notify::{self, EmailNotifier, Notifier};
use pricewatch::scheduler::{CycleOutcome, RefreshScheduler, SchedulerHandle};
use pricewatch::store::{PriceStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "pricewatch", about = "Multi-site product price tracker")]
struct Args {
    /// Run a single refresh cycle, report, and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewatch=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Starting pricewatch...");
    let config = AppConfig::from_env()?;

    let store = Arc::new(
        SqliteStore::connect(&config.database.url, config.database.max_connections).await?,
    );
    store.migrate().await?;

    let sites = Arc::new(config.sites.clone());
    let extractor = Arc::new(SiteExtractor::new(
        config.scraper.clone(),
        config.price_band(),
    )?);
    let runner = Arc::new(FetchRunner::new(
        Arc::clone(&sites),
        extractor,
        config.site_timeout(),
        config.scraper.max_concurrent_checks,
    ));
    let evaluator = DealEvaluator::new(Arc::clone(&sites));
    let notifier = EmailNotifier::from_config(&config.notifications.smtp)?;
    if notifier.is_none() {
        info!("no alert recipient configured, email notifications are off");
    }

    let handle = RefreshScheduler::start(
        runner,
        config.refresh_interval(),
        config.tracker.channel_capacity,
    );

    if args.once {
        run_once(&handle, &config, &evaluator, store.as_ref(), notifier.as_ref()).await?;
        handle.shutdown().await;
        return Ok(());
    }

    run_foreground(&handle, &config, &evaluator, store.as_ref(), notifier.as_ref()).await?;

    info!("Shutting down...");
    handle.shutdown().await;
    Ok(())
}

/// Foreground consumer: polls the scheduler's mailbox on its own cadence and
/// tolerates an empty mailbox. All fetch work stays on the scheduler side.
async fn run_foreground(
    handle: &SchedulerHandle,
    config: &AppConfig,
    evaluator: &DealEvaluator,
    store: &SqliteStore,
    notifier: Option<&EmailNotifier>,
) -> Result<()> {
    let mut poll = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = poll.tick() => {
                while let Some(outcome) = handle.try_receive() {
                    process_outcome(outcome, config, evaluator, store, notifier).await?;
                }
            }
        }
    }
}

async fn run_once(
    handle: &SchedulerHandle,
    config: &AppConfig,
    evaluator: &DealEvaluator,
    store: &SqliteStore,
    notifier: Option<&EmailNotifier>,
) -> Result<()> {
    handle.request_refresh()?;

    loop {
        if let Some(outcome) = handle.try_receive() {
            process_outcome(outcome, config, evaluator, store, notifier).await?;
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

async fn process_outcome(
    outcome: CycleOutcome,
    config: &AppConfig,
    evaluator: &DealEvaluator,
    store: &SqliteStore,
    notifier: Option<&EmailNotifier>,
) -> Result<()> {
    let batch = match outcome {
        CycleOutcome::Failed(reason) => {
            error!("refresh cycle failed: {}", reason);
            return Ok(());
        }
        CycleOutcome::Completed(batch) => batch,
    };

    for (site, reason) in &batch.failures {
        warn!(site = %site, "no price this cycle: {}", reason);
    }

    // Evaluate against the history as it stood before this batch, then
    // persist; a later notification failure never rolls either back.
    let history = store.load_history().await?;
    for observation in &batch.observations {
        store.append(observation).await?;
    }

    for observation in &batch.observations {
        info!(
            site = %observation.site,
            price = %observation.price,
            locator = %observation.locator,
            "current price"
        );
    }

    if let Some(best) = batch.best() {
        info!(
            site = %best.site,
            price = %best.price,
            target = %config.tracker.target_price,
            "best current deal"
        );
    }

    let decisions = evaluator.evaluate(&batch, &history, config.tracker.target_price);
    if decisions.is_empty() {
        return Ok(());
    }

    match notifier {
        Some(notifier) => {
            notify::dispatch_all(notifier as &dyn Notifier, &decisions).await;
        }
        None => {
            for decision in &decisions {
                info!(
                    site = %decision.site,
                    price = %decision.price,
                    "deal found ({}): {}",
                    decision.reasons_joined(),
                    decision.product_url
                );
            }
        }
    }

    Ok(())
}
