// Shared helpers for the integration suite.

pub mod extraction_tests;
pub mod pipeline_tests;

use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch::config::ScraperConfig;
use pricewatch::models::{FetchMode, SiteConfig};
use pricewatch::parser::PriceBand;

pub fn scraper_config() -> ScraperConfig {
    ScraperConfig {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) pricewatch-test".to_string(),
        request_timeout: 5,
        site_timeout: 10,
        retry_attempts: 0,
        retry_delay_ms: 50,
        max_concurrent_checks: 4,
        chrome_path: None,
        settle_secs: 0,
        render_wait_secs: 1,
    }
}

pub fn band() -> PriceBand {
    PriceBand {
        min: Decimal::from(5000),
        max: Decimal::from(15000),
    }
}

pub fn static_site(name: &str, url: &str, locator: &str, backup: Option<&str>) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        url: url.to_string(),
        locator: locator.to_string(),
        backup_locator: backup.map(String::from),
        mode: FetchMode::Static,
        wait_secs: 0,
        product_url: None,
    }
}

pub async fn serve_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
        .mount(server)
        .await;
}

pub const PRODUCT_PAGE: &str = r#"
    <html><body>
        <h1>G-Shock GA-2100</h1>
        <span class="price-current">₹9,999.00</span>
        <span class="price-mrp">₹13,995.00</span>
    </body></html>
"#;
