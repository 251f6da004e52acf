use super::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch::extractor::SiteExtractor;
use pricewatch::fetcher::{CycleRunner, FetchRunner};
use pricewatch::models::LocatorSource;

fn extractor() -> Arc<SiteExtractor> {
    Arc::new(SiteExtractor::new(scraper_config(), band()).unwrap())
}

#[tokio::test]
async fn test_static_extraction_end_to_end() {
    let server = MockServer::start().await;
    serve_page(&server, "/product", PRODUCT_PAGE).await;

    let site = static_site(
        "amazon",
        &format!("{}/product", server.uri()),
        ".price-current",
        None,
    );

    let observation = extractor().extract(&site).await.unwrap();
    assert_eq!(observation.price, Decimal::from_str("9999.00").unwrap());
    assert_eq!(observation.locator, LocatorSource::Primary);
    assert!(observation.in_expected_band);
}

#[tokio::test]
async fn test_client_identity_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE.to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let site = static_site(
        "amazon",
        &format!("{}/product", server.uri()),
        ".price-current",
        None,
    );

    extractor().extract(&site).await.unwrap();
    // The mock's expectation is verified on drop.
}

#[tokio::test]
async fn test_backup_locator_after_markup_drift() {
    // Markup changed: the old class is gone, the backup still matches.
    let drifted = r#"
        <html><body>
            <span class="deal-price">Rs 9,499</span>
        </body></html>
    "#;

    let server = MockServer::start().await;
    serve_page(&server, "/product", drifted).await;

    let site = static_site(
        "amazon",
        &format!("{}/product", server.uri()),
        ".price-current",
        Some(".deal-price"),
    );

    let observation = extractor().extract(&site).await.unwrap();
    assert_eq!(observation.price, Decimal::from(9499));
    assert_eq!(observation.locator, LocatorSource::Backup);
}

#[tokio::test]
async fn test_http_error_status_is_a_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let site = static_site(
        "amazon",
        &format!("{}/product", server.uri()),
        ".price-current",
        None,
    );

    let err = extractor().extract(&site).await.unwrap_err();
    assert!(err.to_string().contains("request failed"));
}

#[tokio::test]
async fn test_runner_isolates_per_site_failures() {
    let server = MockServer::start().await;
    serve_page(&server, "/ok-one", PRODUCT_PAGE).await;
    serve_page(&server, "/ok-two", PRODUCT_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sites = vec![
        static_site("one", &format!("{}/ok-one", server.uri()), ".price-current", None),
        static_site("broken", &format!("{}/broken", server.uri()), ".price-current", None),
        static_site("two", &format!("{}/ok-two", server.uri()), ".price-current", None),
    ];

    let runner = FetchRunner::new(
        Arc::new(sites),
        extractor(),
        Duration::from_secs(10),
        4,
    );

    let batch = runner.run_cycle().await.unwrap();
    assert_eq!(batch.success_count(), 2);
    assert_eq!(batch.failure_count(), 1);
    assert!(batch.failures.contains_key("broken"));
    assert!(batch.contains_site("one"));
    assert!(batch.contains_site("two"));
}

#[tokio::test]
async fn test_slow_site_hits_its_budget_without_dragging_siblings() {
    let server = MockServer::start().await;
    serve_page(&server, "/fast", PRODUCT_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PRODUCT_PAGE.to_string())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let sites = vec![
        static_site("fast", &format!("{}/fast", server.uri()), ".price-current", None),
        static_site("slow", &format!("{}/slow", server.uri()), ".price-current", None),
    ];

    let runner = FetchRunner::new(
        Arc::new(sites),
        extractor(),
        Duration::from_secs(1),
        4,
    );

    let batch = runner.run_cycle().await.unwrap();
    assert_eq!(batch.success_count(), 1);
    assert!(batch.contains_site("fast"));
    assert!(batch.failures["slow"].contains("budget"));
}
