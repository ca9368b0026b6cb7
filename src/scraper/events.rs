use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::models::RouteStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
    Debug,
}

/// Milestones of a confirmation run, rendered by whatever sink the caller picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeEvent {
    LoggedIn { cluster: String },
    SummaryOpened { date: NaiveDate },
    RouteDiscovered { route: String, missing: u32 },
    DiscoveryFinished { routes: usize },
    AssetExcluded { route: String, asset_id: String },
    RouteProcessed { route: String, status: RouteStatus, assets: usize },
    RouteFailed { route: String, error: String },
    SessionClosed,
    TeardownFailed { error: String },
}

impl ScrapeEvent {
    pub fn level(&self) -> LogLevel {
        match self {
            Self::LoggedIn { .. } | Self::DiscoveryFinished { .. } => LogLevel::Success,
            Self::SummaryOpened { .. } | Self::SessionClosed => LogLevel::Info,
            Self::RouteDiscovered { .. } => LogLevel::Info,
            Self::AssetExcluded { .. } => LogLevel::Debug,
            Self::RouteProcessed { status, .. } => match status {
                RouteStatus::Incomplete => LogLevel::Success,
                RouteStatus::NoLinkFound | RouteStatus::Error => LogLevel::Warning,
            },
            Self::RouteFailed { .. } => LogLevel::Error,
            Self::TeardownFailed { .. } => LogLevel::Warning,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &ScrapeEvent);
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ScrapeEvent) {
        match event {
            ScrapeEvent::LoggedIn { cluster } => info!(%cluster, "logged into portal"),
            ScrapeEvent::SummaryOpened { date } => info!(%date, "routes summary opened"),
            ScrapeEvent::RouteDiscovered { route, missing } => {
                info!(%route, missing, "route with missing inventory")
            }
            ScrapeEvent::DiscoveryFinished { routes } => info!(routes, "discovery finished"),
            ScrapeEvent::AssetExcluded { route, asset_id } => {
                debug!(%route, %asset_id, "excluded asset category")
            }
            ScrapeEvent::RouteProcessed {
                route,
                status,
                assets,
            } => match event.level() {
                LogLevel::Warning => warn!(%route, %status, assets, "route processed"),
                _ => info!(%route, %status, assets, "route processed"),
            },
            ScrapeEvent::RouteFailed { route, error } => error!(%route, %error, "route failed"),
            ScrapeEvent::SessionClosed => info!("browser session closed"),
            ScrapeEvent::TeardownFailed { error } => warn!(%error, "browser cleanup warning"),
        }
    }
}
