use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::scraper::extractor::{DetailLayout, ExclusionRules, SummaryLayout};

pub const USERNAME_VAR: &str = "SEED_USERNAME";
pub const PASSWORD_VAR: &str = "SEED_PASSWORD";
pub const BASE_URL_VAR: &str = "SEED_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub username: String,
    #[serde(skip)] // Only ever sourced from the environment
    password: Secret,
    pub headless_mode: bool,
    pub portal: PortalConfig,
    pub summary: SummaryLayout,
    pub detail: DetailLayout,
    pub excluded_categories: ExclusionRules,
    pub export_excel: bool,
    pub export_csv: bool,
    pub export_json: bool,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    /// Used when the post-login URL carries no cluster segment.
    pub default_cluster: String,
    pub chromedriver_port: u16,
    pub chromedriver_path: Option<String>,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    pub login_secs: u64,
    pub navigation_secs: u64,
    pub element_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: Secret::default(),
            headless_mode: true,
            portal: PortalConfig::default(),
            summary: SummaryLayout::default(),
            detail: DetailLayout::default(),
            excluded_categories: ExclusionRules::default(),
            export_excel: true,
            export_csv: false,
            export_json: false,
            output_dir: "downloads/daily".to_string(),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mycantaloupe.com".to_string(),
            default_cluster: "cs4".to_string(),
            chromedriver_port: 9516,
            chromedriver_path: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            login_secs: 30,
            navigation_secs: 20,
            element_secs: 10,
        }
    }
}

impl Timeouts {
    pub fn login(&self) -> Duration {
        Duration::from_secs(self.login_secs)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_secs)
    }

    pub fn element(&self) -> Duration {
        Duration::from_secs(self.element_secs)
    }
}

#[derive(Clone, Default)]
struct Secret(String);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Portal login, kept out of `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AppConfig {
    /// Reads the config file (defaults when absent), then applies `.env` and
    /// process environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Invalid config file {}: {}", config_path.display(), e))?
        } else {
            Self::default()
        };

        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key));
        Ok(config)
    }

    /// Overrides credentials and portal URL from the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let non_empty = |key: &str| lookup(key).ok().filter(|v| !v.trim().is_empty());

        if let Some(username) = non_empty(USERNAME_VAR) {
            self.username = username;
        }
        if let Some(password) = non_empty(PASSWORD_VAR) {
            self.password = Secret(password);
        }
        if let Some(base_url) = non_empty(BASE_URL_VAR) {
            self.portal.base_url = base_url.trim_end_matches('/').to_string();
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(config_path)
    }

    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "seed-reports", "inventory-confirmation")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }

    pub fn has_password(&self) -> bool {
        !self.password.0.is_empty()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.0.clone(),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.username.is_empty() {
            errors.push(format!("{USERNAME_VAR} is required"));
        }

        if !self.has_password() {
            errors.push(format!("{PASSWORD_VAR} is required"));
        }

        if reqwest::Url::parse(&self.portal.base_url).is_err() {
            errors.push(format!("Portal base URL is invalid: {}", self.portal.base_url));
        }

        if self.portal.default_cluster.trim().is_empty() {
            errors.push("Default cluster prefix is required".to_string());
        }

        if self.summary.route_prefix.trim().is_empty() {
            errors.push("Route name prefix is required".to_string());
        }

        if self.detail.placeholder.trim().is_empty() {
            errors.push("Inventory placeholder token is required".to_string());
        }

        let timeouts = &self.portal.timeouts;
        if timeouts.login_secs == 0 || timeouts.navigation_secs == 0 || timeouts.element_secs == 0 {
            errors.push("Timeouts must be greater than zero".to_string());
        }

        if !self.export_excel && !self.export_csv && !self.export_json {
            errors.push("At least one export format must be selected".to_string());
        }

        errors
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
