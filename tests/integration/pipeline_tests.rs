use super::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch::deals::DealEvaluator;
use pricewatch::extractor::SiteExtractor;
use pricewatch::fetcher::FetchRunner;
use pricewatch::models::AlertReason;
use pricewatch::scheduler::{CycleOutcome, RefreshScheduler};
use pricewatch::store::{PriceStore, SqliteStore};

async fn wait_for_outcome(
    handle: &pricewatch::scheduler::SchedulerHandle,
) -> CycleOutcome {
    for _ in 0..100 {
        if let Some(outcome) = handle.try_receive() {
            return outcome;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no cycle outcome within two seconds");
}

#[tokio::test]
async fn test_refresh_evaluate_persist_pipeline() {
    let server = MockServer::start().await;
    serve_page(
        &server,
        "/deal",
        r#"<html><body><span class="price-current">₹8,900</span></body></html>"#,
    )
    .await;
    serve_page(
        &server,
        "/steady",
        r#"<html><body><span class="price-current">₹11,200</span></body></html>"#,
    )
    .await;

    let sites = Arc::new(vec![
        static_site("amazon", &format!("{}/deal", server.uri()), ".price-current", None),
        static_site("flipkart", &format!("{}/steady", server.uri()), ".price-current", None),
    ]);

    let extractor = Arc::new(SiteExtractor::new(scraper_config(), band()).unwrap());
    let runner = Arc::new(FetchRunner::new(
        Arc::clone(&sites),
        extractor,
        Duration::from_secs(10),
        4,
    ));

    let store = SqliteStore::connect("sqlite::memory:", 1).await.unwrap();
    store.migrate().await.unwrap();

    // Seed history so the deal site registers as a new low.
    let seeded = pricewatch::models::PriceObservation::new(
        "amazon",
        Decimal::from(10000),
        pricewatch::models::LocatorSource::Primary,
        pricewatch::models::FetchMode::Static,
        true,
    );
    store.append(&seeded).await.unwrap();

    let handle = RefreshScheduler::start(runner, Duration::from_secs(3600), 4);
    handle.request_refresh().unwrap();

    let batch = match wait_for_outcome(&handle).await {
        CycleOutcome::Completed(batch) => batch,
        CycleOutcome::Failed(reason) => panic!("cycle failed: {}", reason),
    };

    assert_eq!(batch.success_count(), 2);
    assert_eq!(batch.failure_count(), 0);

    // Evaluate against pre-batch history, then persist the batch.
    let history = store.load_history().await.unwrap();
    for observation in &batch.observations {
        store.append(observation).await.unwrap();
    }

    let evaluator = DealEvaluator::new(Arc::clone(&sites));
    let decisions = evaluator.evaluate(&batch, &history, Decimal::from(9500));

    assert_eq!(decisions.len(), 1);
    let decision = &decisions[0];
    assert_eq!(decision.site, "amazon");
    assert!(decision.reasons.contains(&AlertReason::AtOrBelowTarget));
    assert!(decision.reasons.contains(&AlertReason::NewHistoricalLow));
    assert!(decision.reasons.contains(&AlertReason::SignificantDrop));
    assert_eq!(decision.historical_min, Some(Decimal::from(10000)));

    // Persisted history now reflects the cycle.
    let after = store.load_history().await.unwrap();
    assert_eq!(after.global_min, Some(Decimal::from(8900)));
    assert_eq!(after.latest_for("flipkart"), Some(Decimal::from(11200)));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_manual_refresh_rejected_while_cycle_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PRODUCT_PAGE.to_string())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let sites = Arc::new(vec![static_site(
        "slow",
        &format!("{}/slow", server.uri()),
        ".price-current",
        None,
    )]);

    let extractor = Arc::new(SiteExtractor::new(scraper_config(), band()).unwrap());
    let runner = Arc::new(FetchRunner::new(
        Arc::clone(&sites),
        extractor,
        Duration::from_secs(10),
        4,
    ));

    let handle = RefreshScheduler::start(runner, Duration::from_secs(3600), 4);

    handle.request_refresh().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The first cycle is still fetching the slow page.
    assert!(handle.request_refresh().is_err());

    // It still completes and delivers exactly one outcome.
    match wait_for_outcome(&handle).await {
        CycleOutcome::Completed(batch) => assert_eq!(batch.success_count(), 1),
        CycleOutcome::Failed(reason) => panic!("cycle failed: {}", reason),
    }
    assert!(handle.try_receive().is_none());

    handle.shutdown().await;
}

#[test]
fn test_shipped_default_config_is_valid() {
    // The repository's config/default.toml must deserialize and validate.
    let raw = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/default.toml"
    ))
    .unwrap();

    let config: pricewatch::AppConfig = toml::from_str(&raw).unwrap();
    config.validate().unwrap();
    assert!(!config.sites.is_empty());
}
