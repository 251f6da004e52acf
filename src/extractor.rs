use headless_chrome::{Browser, LaunchOptions};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;
use tracing::{debug, warn};

use crate::config::ScraperConfig;
use crate::models::{FetchMode, LocatorSource, PriceObservation, SiteConfig};
use crate::parser::{PriceBand, PriceParser};
use crate::utils::error::{AppError, ExtractError};

/// Lazily launched browser shared across refresh cycles. Mutual exclusion of
/// cycles means only the running fetch task ever touches it; each extraction
/// gets a fresh tab and closes it, so the session stays clean between uses.
struct RenderSession {
    chrome_path: Option<String>,
    browser: Mutex<Option<Arc<Browser>>>,
}

impl RenderSession {
    fn new(chrome_path: Option<String>) -> Self {
        Self {
            chrome_path,
            browser: Mutex::new(None),
        }
    }

    async fn browser(&self) -> Result<Arc<Browser>, ExtractError> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let chrome_path = self.chrome_path.clone();
        let browser = tokio::task::spawn_blocking(move || Self::launch(chrome_path))
            .await
            .map_err(|e| ExtractError::Fetch(format!("browser launch task failed: {}", e)))??;

        let browser = Arc::new(browser);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }

    fn launch(chrome_path: Option<String>) -> Result<Browser, ExtractError> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| ExtractError::Fetch(format!("failed to create launch options: {}", e)))?;

        if let Some(path) = chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(path));
        }

        Browser::new(launch_options)
            .map_err(|e| ExtractError::Fetch(format!("failed to launch browser: {}", e)))
    }
}

/// Pulls a price out of one configured site: retrieve the page per the
/// site's mode, apply the primary locator, fall back to the backup, and run
/// the parser on whatever text the locator yields.
pub struct SiteExtractor {
    config: ScraperConfig,
    parser: PriceParser,
    http: reqwest::Client,
    render: RenderSession,
}

impl SiteExtractor {
    pub fn new(config: ScraperConfig, band: PriceBand) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        let render = RenderSession::new(config.chrome_path.clone());

        Ok(Self {
            config,
            parser: PriceParser::new(band),
            http,
            render,
        })
    }

    pub async fn extract(&self, site: &SiteConfig) -> Result<PriceObservation, ExtractError> {
        let page = match site.mode {
            FetchMode::Static => self.fetch_static(&site.url).await?,
            FetchMode::Rendered => self.fetch_rendered(site).await?,
        };

        self.extract_from_page(site, &page)
    }

    /// Locator fallback over already-retrieved markup. Primary first; the
    /// backup only runs when it is configured and distinct, and only after
    /// the primary yielded nothing parseable.
    fn extract_from_page(
        &self,
        site: &SiteConfig,
        page: &str,
    ) -> Result<PriceObservation, ExtractError> {
        let document = Html::parse_document(page);

        let primary_err = match self.attempt_locator(site, &document, &site.locator, LocatorSource::Primary)
        {
            Ok(observation) => return Ok(observation),
            Err(e) => e,
        };

        if let Some(backup) = site.distinct_backup() {
            debug!(
                site = %site.name,
                primary = %site.locator,
                backup = %backup,
                "primary locator failed ({}), trying backup",
                primary_err
            );

            match self.attempt_locator(site, &document, backup, LocatorSource::Backup) {
                Ok(observation) => return Ok(observation),
                Err(backup_err) => {
                    return Err(ExtractError::LocatorsExhausted {
                        site: site.name.clone(),
                        last: backup_err.to_string(),
                    })
                }
            }
        }

        Err(ExtractError::LocatorsExhausted {
            site: site.name.clone(),
            last: primary_err.to_string(),
        })
    }

    fn attempt_locator(
        &self,
        site: &SiteConfig,
        document: &Html,
        locator: &str,
        source: LocatorSource,
    ) -> Result<PriceObservation, ExtractError> {
        let selector = Selector::parse(locator).map_err(|_| ExtractError::Selector {
            locator: locator.to_string(),
        })?;

        let element = document
            .select(&selector)
            .next()
            .ok_or_else(|| ExtractError::NoMatch {
                locator: locator.to_string(),
            })?;

        let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
        let parsed = self.parser.parse(&text)?;

        if !parsed.in_expected_band {
            warn!(
                site = %site.name,
                price = %parsed.amount,
                "price outside expected band, keeping it anyway"
            );
        }

        Ok(PriceObservation::new(
            &site.name,
            parsed.amount,
            source,
            site.mode,
            parsed.in_expected_band,
        ))
    }

    async fn fetch_static(&self, url: &str) -> Result<String, ExtractError> {
        let strategy = FixedInterval::from_millis(self.config.retry_delay_ms)
            .take(self.config.retry_attempts as usize);

        let response = Retry::spawn(strategy, || async {
            self.http.get(url).send().await?.error_for_status()
        })
        .await
        .map_err(|e| ExtractError::Fetch(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| ExtractError::Fetch(e.to_string()))
    }

    /// Drive a browser tab to the page, give scripts a fixed settle delay,
    /// then wait for the primary locator before grabbing the DOM. The
    /// headless_chrome API is blocking, so the tab work runs on a blocking
    /// thread.
    async fn fetch_rendered(&self, site: &SiteConfig) -> Result<String, ExtractError> {
        let browser = self.render.browser().await?;

        let url = site.url.clone();
        let locator = site.locator.clone();
        let user_agent = self.config.user_agent.clone();
        let settle = Duration::from_secs(self.config.settle_secs);
        let render_wait = Duration::from_secs(self.config.render_wait_secs);

        tokio::task::spawn_blocking(move || {
            let tab = browser
                .new_tab()
                .map_err(|e| ExtractError::Fetch(format!("failed to create tab: {}", e)))?;

            tab.set_user_agent(&user_agent, None, None)
                .map_err(|e| ExtractError::Fetch(format!("failed to set user agent: {}", e)))?;

            tab.navigate_to(&url)
                .map_err(|e| ExtractError::Fetch(format!("navigation failed: {}", e)))?;
            tab.wait_until_navigated()
                .map_err(|e| ExtractError::Fetch(format!("page load failed: {}", e)))?;

            std::thread::sleep(settle);

            if tab
                .wait_for_element_with_custom_timeout(&locator, render_wait)
                .is_err()
            {
                let _ = tab.close(true);
                return Err(ExtractError::RenderTimeout {
                    locator,
                    waited_ms: render_wait.as_millis() as u64,
                });
            }

            let content = tab
                .get_content()
                .map_err(|e| ExtractError::Fetch(format!("failed to get page content: {}", e)));

            let _ = tab.close(true);
            content
        })
        .await
        .map_err(|e| ExtractError::Fetch(format!("render task failed: {}", e)))?
    }
}
