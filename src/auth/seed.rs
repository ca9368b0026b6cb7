use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use thirtyfour::Key;
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::error::ScrapeError;
use crate::scraper::browser::BrowserDriver;
use crate::scraper::selectors;

const SIGN_IN_CLICK_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub success: bool,
    /// Cluster segment the portal routed this session to, when the URL carried one.
    pub cluster_prefix: Option<String>,
}

fn cluster_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)/(cs\d+)(?:[/?#]|$)").expect("valid cluster pattern"))
}

/// Extracts the `cs<N>` cluster segment from a portal URL.
pub fn cluster_from_url(url: &str) -> Option<String> {
    cluster_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

fn same_site(host: &str, base_host: &str) -> bool {
    host.eq_ignore_ascii_case(base_host)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{}", base_host.to_ascii_lowercase()))
}

/// True once the browser has left the login page for an authenticated view.
pub fn is_home_url(url: &str, base_url: &str) -> bool {
    let (Ok(url), Ok(base)) = (Url::parse(url), Url::parse(base_url)) else {
        return false;
    };
    let (Some(host), Some(base_host)) = (url.host_str(), base.host_str()) else {
        return false;
    };
    if !same_site(host, base_host) {
        return false;
    }

    let path = url.path().to_ascii_lowercase();
    if ["login", "signin", "logon"].iter().any(|p| path.contains(p)) {
        return false;
    }
    path.trim_matches('/') != "" || cluster_from_url(url.as_str()).is_some()
}

/// Signs into the portal and reports the cluster the session landed on.
///
/// When the login form never shows up but the browser is already on an
/// authenticated page, the existing session is reused.
pub async fn login(
    browser: &BrowserDriver,
    portal: &PortalConfig,
    username: &str,
    password: &str,
) -> Result<LoginResult, ScrapeError> {
    info!(base_url = %portal.base_url, "logging into SEED");
    browser.navigate(&portal.base_url).await?;

    let password_field = match browser
        .wait_for_element(selectors::password_input(), portal.timeouts.element())
        .await
    {
        Ok(field) => field,
        Err(e) if e.is_timeout() => {
            let url = browser.get_current_url().await?;
            if is_home_url(&url, &portal.base_url) {
                info!("no login form shown, session already authenticated");
                return Ok(LoginResult {
                    success: true,
                    cluster_prefix: cluster_from_url(&url),
                });
            }
            return Err(ScrapeError::Authentication(format!(
                "login form did not appear at {url}"
            )));
        }
        Err(e) => return Err(e),
    };

    let email_field = browser
        .find_element(selectors::email_input())
        .await
        .map_err(|e| ScrapeError::Authentication(format!("email field not found: {e}")))?;

    debug!("submitting credentials");
    browser.send_keys(&email_field, username).await?;
    browser.send_keys(&password_field, password).await?;

    match browser.find_visible(selectors::sign_in_button()).await? {
        Some(button) => browser.click_with_retry(&button, SIGN_IN_CLICK_ATTEMPTS).await?,
        None => password_field.send_keys(Key::Return).await?,
    }

    let url = browser
        .wait_for_url("portal home page", portal.timeouts.login(), |url| {
            is_home_url(url, &portal.base_url)
        })
        .await
        .map_err(|e| e.in_phase(ScrapeError::Authentication))?;

    let cluster_prefix = cluster_from_url(&url);
    info!(cluster = cluster_prefix.as_deref().unwrap_or("<default>"), "login successful");

    Ok(LoginResult {
        success: true,
        cluster_prefix,
    })
}
