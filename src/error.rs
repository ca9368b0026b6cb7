use thiserror::Error;

/// Failures of the confirmation scrape, grouped by the phase that raised them.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser setup failed: {0}")]
    BrowserSetup(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    #[error("no route data found for {date}")]
    NoRouteData { date: chrono::NaiveDate },

    #[error("run interrupted")]
    Interrupted,

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("unexpected script result: {0}")]
    Script(#[from] serde_json::Error),
}

impl ScrapeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Folds a timeout into a phase error so callers see where it happened.
    pub fn in_phase(self, phase: fn(String) -> ScrapeError) -> ScrapeError {
        match self {
            Self::Timeout { .. } | Self::WebDriver(_) => phase(self.to_string()),
            other => other,
        }
    }
}
