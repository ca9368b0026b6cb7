use std::future::Future;
use std::time::Duration;

use thirtyfour::prelude::*;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::extractor::TableSnapshot;
use crate::error::ScrapeError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CONNECT_ATTEMPTS: u32 = 3;

const TABLE_SNAPSHOT_SCRIPT: &str = r#"
    if (!document.querySelector('table')) { return null; }
    return Array.from(document.querySelectorAll(arguments[0])).map(function (tr) {
        return Array.from(tr.querySelectorAll('td')).map(function (td) {
            return (td.textContent || '').trim();
        });
    });
"#;

/// Polls `probe` until it yields a value or `timeout` elapses.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    mut probe: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        if start.elapsed() >= timeout {
            return Err(ScrapeError::Timeout {
                what: what.to_string(),
                secs: timeout.as_secs(),
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// True once the browser has left `from_url` or the element clicked there
/// is no longer attached to the document.
pub fn view_changed(from_url: &str, current_url: &str, marker_attached: bool) -> bool {
    current_url != from_url || !marker_attached
}

/// The single WebDriver session every portal operation runs through.
pub struct BrowserDriver {
    driver: Option<WebDriver>,
    headless: bool,
}

impl BrowserDriver {
    pub async fn new(headless: bool, port: u16) -> Result<Self, ScrapeError> {
        debug!(headless, port, "creating WebDriver session");

        let mut caps = DesiredCapabilities::chrome();
        let mut chrome_args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-extensions",
            "--disable-features=TranslateUI",
            "--no-first-run",
            "--password-store=basic",
            "--window-size=1920,1080",
        ];
        if headless {
            chrome_args.push("--headless=new");
        }
        for arg in chrome_args {
            caps.add_arg(arg)
                .map_err(|e| ScrapeError::BrowserSetup(format!("invalid Chrome argument {arg}: {e}")))?;
        }

        let server_url = format!("http://localhost:{port}");
        let mut last_error = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            match WebDriver::new(&server_url, caps.clone()).await {
                Ok(driver) => {
                    debug!(attempt, "connected to ChromeDriver");
                    return Ok(Self {
                        driver: Some(driver),
                        headless,
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "ChromeDriver connection attempt failed");
                    last_error = Some(e);
                    if attempt < CONNECT_ATTEMPTS {
                        sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        Err(ScrapeError::BrowserSetup(format!(
            "could not connect to ChromeDriver on port {port} after {CONNECT_ATTEMPTS} attempts: {}",
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    fn driver(&self) -> Result<&WebDriver, ScrapeError> {
        self.driver
            .as_ref()
            .ok_or_else(|| ScrapeError::Navigation("browser session is closed".to_string()))
    }

    pub async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        debug!(url, "navigating");
        self.driver()?
            .goto(url)
            .await
            .map_err(|e| ScrapeError::Navigation(format!("could not open {url}: {e}")))
    }

    pub async fn back(&self) -> Result<(), ScrapeError> {
        self.driver()?.back().await?;
        Ok(())
    }

    pub async fn get_current_url(&self) -> Result<String, ScrapeError> {
        Ok(self.driver()?.current_url().await?.to_string())
    }

    pub async fn find_element(&self, selector: By) -> Result<WebElement, ScrapeError> {
        Ok(self.driver()?.find(selector).await?)
    }

    pub async fn find_elements(&self, selector: By) -> Result<Vec<WebElement>, ScrapeError> {
        Ok(self.driver()?.find_all(selector).await?)
    }

    /// First displayed element matching `selector`, if any.
    pub async fn find_visible(&self, selector: By) -> Result<Option<WebElement>, ScrapeError> {
        for element in self.find_elements(selector).await? {
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    pub async fn wait_for_element(
        &self,
        selector: By,
        timeout: Duration,
    ) -> Result<WebElement, ScrapeError> {
        let what = format!("element {selector:?}");
        poll_until(&what, timeout, || {
            let selector = selector.clone();
            async move { self.find_visible(selector).await.ok().flatten() }
        })
        .await
    }

    /// Waits until the current URL satisfies `accept`, returning that URL.
    pub async fn wait_for_url<F>(
        &self,
        what: &str,
        timeout: Duration,
        accept: F,
    ) -> Result<String, ScrapeError>
    where
        F: Fn(&str) -> bool,
    {
        let accept = &accept;
        poll_until(what, timeout, || async move {
            self.get_current_url()
                .await
                .ok()
                .filter(|url| accept(url.as_str()))
        })
        .await
    }

    /// Waits for the view to move away from `from_url` (see [`view_changed`]).
    /// Returns `true` when the URL changed, `false` when only `marker` went stale.
    pub async fn wait_for_departure(
        &self,
        from_url: &str,
        marker: &WebElement,
        timeout: Duration,
    ) -> Result<bool, ScrapeError> {
        poll_until("view change", timeout, || async move {
            let url = self.get_current_url().await.ok()?;
            let attached = marker.is_present().await.unwrap_or(true);
            view_changed(from_url, &url, attached).then(|| url != from_url)
        })
        .await
    }

    pub async fn wait_for_page_load(&self, timeout: Duration) -> Result<(), ScrapeError> {
        poll_until("document ready state", timeout, || async move {
            let state = self
                .execute_script_and_get_value("return document.readyState", Vec::new())
                .await
                .ok()?;
            (state.as_str() == Some("complete")).then_some(())
        })
        .await
    }

    pub async fn click_with_retry(
        &self,
        element: &WebElement,
        max_attempts: u32,
    ) -> Result<(), ScrapeError> {
        let mut attempt = 1;
        loop {
            match element.click().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    debug!(attempt, error = %e, "click failed, retrying");
                    attempt += 1;
                    sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn send_keys(&self, element: &WebElement, text: &str) -> Result<(), ScrapeError> {
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    pub async fn execute_script_and_get_value(
        &self,
        script: &str,
        args: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, ScrapeError> {
        let ret = self.driver()?.execute(script, args).await?;
        Ok(ret.json().clone())
    }

    /// Cell texts of every row matched by `row_selector`, `None` without a table.
    pub async fn table_snapshot(
        &self,
        row_selector: &str,
    ) -> Result<Option<TableSnapshot>, ScrapeError> {
        let value = self
            .execute_script_and_get_value(
                TABLE_SNAPSHOT_SCRIPT,
                vec![serde_json::Value::String(row_selector.to_string())],
            )
            .await?;
        let rows: Option<Vec<Vec<String>>> = serde_json::from_value(value)?;
        Ok(rows.map(TableSnapshot::new))
    }

    /// Ends the WebDriver session. Safe to call more than once.
    pub async fn quit(&mut self) -> Result<(), ScrapeError> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await?;
        }
        Ok(())
    }
}
