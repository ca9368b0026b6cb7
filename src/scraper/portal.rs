use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use thirtyfour::By;
use tracing::{debug, info, warn};

use super::browser::BrowserDriver;
use super::extractor::{SummaryLayout, TableSnapshot};
use super::selectors;
use super::Portal;
use crate::auth::{self, LoginResult};
use crate::chromedriver_manager::ChromeDriverManager;
use crate::config::{AppConfig, Credentials, PortalConfig};
use crate::error::ScrapeError;
use crate::models::Route;

const LINK_CLICK_ATTEMPTS: u32 = 3;

/// `{base}/{cluster}/Reports/RoutesSummary?date=YYYY-MM-DD`
pub fn summary_url(base_url: &str, cluster: &str, date: NaiveDate) -> Result<String, ScrapeError> {
    let raw = format!(
        "{}/{}/Reports/{}",
        base_url.trim_end_matches('/'),
        cluster.trim_matches('/'),
        selectors::SUMMARY_PATH_MARKER
    );
    let mut url = Url::parse(&raw)
        .map_err(|e| ScrapeError::Navigation(format!("invalid portal URL {raw}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("date", &date.format("%Y-%m-%d").to_string());
    Ok(url.into())
}

fn is_summary_url(url: &str) -> bool {
    url.contains(selectors::SUMMARY_PATH_MARKER)
}

/// How to get back to the routes summary after a detail view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnStep {
    Stay,
    Back,
    Reload,
}

/// `summary_replaced` is set while a detail view may have been rendered over
/// the summary without changing the URL.
fn return_step(on_summary_url: bool, summary_replaced: bool) -> ReturnStep {
    match (on_summary_url, summary_replaced) {
        (_, true) => ReturnStep::Reload,
        (true, false) => ReturnStep::Stay,
        (false, false) => ReturnStep::Back,
    }
}

/// An authenticated browser session against the SEED portal.
pub struct PortalSession {
    browser: BrowserDriver,
    chromedriver: ChromeDriverManager,
    portal: PortalConfig,
    summary_layout: SummaryLayout,
    cluster: String,
    summary_url: Option<String>,
    summary_replaced: bool,
    closed: bool,
}

impl PortalSession {
    /// Starts chromedriver and a browser. Anything started before a failure is
    /// stopped again before the error is returned.
    pub async fn open(config: &AppConfig) -> Result<Self, ScrapeError> {
        let portal = config.portal.clone();
        let chromedriver = ChromeDriverManager::new(portal.chromedriver_path.as_deref());

        chromedriver
            .start_driver(portal.chromedriver_port)
            .await
            .map_err(|e| ScrapeError::BrowserSetup(format!("{e:#}")))?;

        let browser = match BrowserDriver::new(config.headless_mode, portal.chromedriver_port).await {
            Ok(browser) => browser,
            Err(e) => {
                if let Err(stop) = chromedriver.stop_driver().await {
                    warn!(error = %stop, "could not stop ChromeDriver after failed setup");
                }
                return Err(e);
            }
        };
        info!(headless = browser.is_headless(), "browser session opened");

        Ok(Self {
            browser,
            chromedriver,
            cluster: portal.default_cluster.clone(),
            portal,
            summary_layout: config.summary.clone(),
            summary_url: None,
            summary_replaced: false,
            closed: false,
        })
    }

    async fn find_route_link(&self, route: &Route) -> Result<Option<thirtyfour::WebElement>, ScrapeError> {
        for xpath in selectors::route_link_candidates(&route.normalized_name(), &self.summary_layout) {
            if let Some(link) = self.browser.find_visible(By::XPath(xpath.as_str())).await? {
                debug!(route = %route.name, %xpath, "route link found");
                return Ok(Some(link));
            }
        }
        Ok(None)
    }

    async fn reload_summary(&self, timeout: std::time::Duration) -> Result<(), ScrapeError> {
        let url = self
            .summary_url
            .clone()
            .ok_or_else(|| ScrapeError::Navigation("routes summary was never opened".to_string()))?;
        self.browser.navigate(&url).await?;
        self.browser
            .wait_for_url("routes summary", timeout, is_summary_url)
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))?;
        Ok(())
    }

    async fn snapshot(&self, view: &str) -> Result<TableSnapshot, ScrapeError> {
        self.browser
            .table_snapshot(selectors::TABLE_ROWS)
            .await?
            .ok_or_else(|| ScrapeError::Extraction(format!("no table found on the {view} page")))
    }
}

#[async_trait]
impl Portal for PortalSession {
    async fn login(&mut self, credentials: &Credentials) -> Result<LoginResult, ScrapeError> {
        let result = auth::login(
            &self.browser,
            &self.portal,
            &credentials.username,
            &credentials.password,
        )
        .await?;

        match &result.cluster_prefix {
            Some(cluster) => self.cluster = cluster.clone(),
            None => info!(cluster = %self.cluster, "no cluster in post-login URL, using default"),
        }
        Ok(result)
    }

    async fn open_summary(&mut self, date: NaiveDate) -> Result<(), ScrapeError> {
        let url = summary_url(&self.portal.base_url, &self.cluster, date)?;
        info!(%date, "navigating to routes summary");
        self.browser.navigate(&url).await?;

        let timeouts = &self.portal.timeouts;
        self.browser
            .wait_for_url("routes summary", timeouts.navigation(), is_summary_url)
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))?;
        self.browser
            .wait_for_page_load(timeouts.navigation())
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))?;

        self.summary_url = Some(url);
        self.summary_replaced = false;
        Ok(())
    }

    async fn summary_table(&mut self) -> Result<TableSnapshot, ScrapeError> {
        self.snapshot("routes summary").await
    }

    async fn open_route_detail(&mut self, route: &Route) -> Result<bool, ScrapeError> {
        let Some(link) = self.find_route_link(route).await? else {
            return Ok(false);
        };
        let from_url = self.browser.get_current_url().await?;
        self.summary_replaced = true;
        self.browser.click_with_retry(&link, LINK_CLICK_ATTEMPTS).await?;

        let timeouts = &self.portal.timeouts;
        let url_changed = self
            .browser
            .wait_for_departure(&from_url, &link, timeouts.navigation())
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))?;
        self.summary_replaced = !url_changed;
        debug!(route = %route.name, url_changed, "left routes summary");

        self.browser
            .wait_for_page_load(timeouts.navigation())
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))?;
        self.browser
            .wait_for_element(selectors::table_data_cell(), timeouts.element())
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))?;
        Ok(true)
    }

    async fn detail_table(&mut self) -> Result<TableSnapshot, ScrapeError> {
        self.snapshot("route detail").await
    }

    async fn return_to_summary(&mut self) -> Result<(), ScrapeError> {
        let on_summary = is_summary_url(&self.browser.get_current_url().await?);
        let timeout = self.portal.timeouts.navigation();

        match return_step(on_summary, self.summary_replaced) {
            ReturnStep::Stay => return Ok(()),
            ReturnStep::Reload => self.reload_summary(timeout).await?,
            ReturnStep::Back => {
                self.browser.back().await?;
                if self
                    .browser
                    .wait_for_url("routes summary", timeout, is_summary_url)
                    .await
                    .is_err()
                {
                    // History did not lead back; load the summary directly.
                    self.reload_summary(timeout).await?;
                }
            }
        }
        self.summary_replaced = false;

        self.browser
            .wait_for_page_load(timeout)
            .await
            .map_err(|e| e.in_phase(ScrapeError::Navigation))
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let quit = self.browser.quit().await;
        if let Err(e) = self.chromedriver.stop_driver().await {
            warn!(error = %e, "could not stop ChromeDriver");
        }
        quit
    }
}
