use std::future::Future;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{AppConfig, Credentials};
use crate::error::ScrapeError;
use crate::models::ConfirmationReport;
use crate::scraper::extractor::{DetailLayout, ExclusionRules, SummaryLayout};
use crate::scraper::{
    aggregate, discover_incomplete_routes, extract_assets, EventSink, Portal, ScrapeEvent,
};

/// Everything one confirmation run needs besides the portal itself.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub credentials: Credentials,
    pub target_date: NaiveDate,
    pub summary: SummaryLayout,
    pub detail: DetailLayout,
    pub exclusions: ExclusionRules,
}

impl RunSettings {
    pub fn from_config(config: &AppConfig, target_date: NaiveDate) -> Self {
        Self {
            credentials: config.credentials(),
            target_date,
            summary: config.summary.clone(),
            detail: config.detail.clone(),
            exclusions: config.excluded_categories.clone(),
        }
    }
}

/// Login, discovery and per-route extraction against an open portal session.
/// Does not close the session.
pub async fn run_confirmation<P>(
    portal: &mut P,
    settings: &RunSettings,
    events: &dyn EventSink,
) -> Result<ConfirmationReport, ScrapeError>
where
    P: Portal + ?Sized,
{
    let started = Instant::now();
    let date = settings.target_date;

    let login = portal.login(&settings.credentials).await?;
    if !login.success {
        return Err(ScrapeError::Authentication("portal rejected the login".to_string()));
    }
    events.emit(&ScrapeEvent::LoggedIn {
        cluster: login.cluster_prefix.unwrap_or_else(|| "<default>".to_string()),
    });

    let routes = discover_incomplete_routes(&mut *portal, date, &settings.summary, events).await?;
    if routes.is_empty() {
        return Err(ScrapeError::NoRouteData { date });
    }

    let mut results = Vec::with_capacity(routes.len());
    for route in &routes {
        info!(route = %route.name, missing = route.missing_count, "processing route");
        let result = extract_assets(
            &mut *portal,
            route,
            date,
            &settings.detail,
            &settings.exclusions,
            events,
        )
        .await;
        results.push(result);
    }

    let records = aggregate(&results);
    info!(routes = results.len(), assets = records.len(), "confirmation scrape finished");

    Ok(ConfirmationReport {
        target_date: date,
        generated_at: chrono::Local::now(),
        routes: results,
        records,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}

/// Resolves on ctrl-c. Never resolves if the handler cannot be installed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for ctrl-c, run cannot be interrupted");
        std::future::pending::<()>().await;
    }
}

/// Awaits `step` unless `cancel` resolves first. `cancel` stays usable
/// afterwards, so one signal future can guard setup and the run itself.
pub async fn until_cancelled<T, F, C>(step: F, cancel: &mut C) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, ScrapeError>>,
    C: Future<Output = ()> + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel => Err(ScrapeError::Interrupted),
        outcome = step => outcome,
    }
}

/// Runs the scrape and closes the session exactly once, whether the run
/// succeeds, fails, or `cancel` resolves first.
pub async fn run_with_teardown<P, C>(
    mut portal: P,
    settings: &RunSettings,
    events: &dyn EventSink,
    cancel: C,
) -> Result<ConfirmationReport, ScrapeError>
where
    P: Portal,
    C: Future<Output = ()>,
{
    let outcome = tokio::select! {
        biased;
        _ = cancel => Err(ScrapeError::Interrupted),
        outcome = run_confirmation(&mut portal, settings, events) => outcome,
    };

    match portal.close().await {
        Ok(()) => events.emit(&ScrapeEvent::SessionClosed),
        Err(e) => events.emit(&ScrapeEvent::TeardownFailed {
            error: e.to_string(),
        }),
    }

    outcome
}
