use chrono::NaiveDate;
use tracing::warn;

use super::events::{EventSink, ScrapeEvent};
use super::extractor::{DetailLayout, DetailPage, ExclusionRules};
use super::Portal;
use crate::error::ScrapeError;
use crate::models::{Route, RouteResult};

/// Collects the assets of one route that still need inventory confirmation.
///
/// Never fails: a missing link yields `NoLinkFound`, any other failure yields
/// `Error`, both with no assets, so the remaining routes still run.
pub async fn extract_assets<P>(
    portal: &mut P,
    route: &Route,
    date: NaiveDate,
    layout: &DetailLayout,
    rules: &ExclusionRules,
    events: &dyn EventSink,
) -> RouteResult
where
    P: Portal + ?Sized,
{
    let result = match scan_route(portal, route, date, layout, rules, events).await {
        Ok(result) => result,
        Err(e) => {
            events.emit(&ScrapeEvent::RouteFailed {
                route: route.name.clone(),
                error: e.to_string(),
            });
            // Leave the browser on the summary so the next route can find its link.
            if let Err(recover) = portal.return_to_summary().await {
                warn!(route = %route.name, error = %recover, "could not return to summary");
            }
            RouteResult::failed(route.clone(), date, e.to_string())
        }
    };

    events.emit(&ScrapeEvent::RouteProcessed {
        route: route.name.clone(),
        status: result.status,
        assets: result.assets.len(),
    });
    result
}

async fn scan_route<P>(
    portal: &mut P,
    route: &Route,
    date: NaiveDate,
    layout: &DetailLayout,
    rules: &ExclusionRules,
    events: &dyn EventSink,
) -> Result<RouteResult, ScrapeError>
where
    P: Portal + ?Sized,
{
    if !portal.open_route_detail(route).await? {
        return Ok(RouteResult::no_link(route.clone(), date));
    }

    let table = portal.detail_table().await?;
    let scan = DetailPage::new(&table, layout).pending_assets(rules);
    for asset_id in scan.excluded {
        events.emit(&ScrapeEvent::AssetExcluded {
            route: route.name.clone(),
            asset_id,
        });
    }

    portal.return_to_summary().await?;
    Ok(RouteResult::incomplete(route.clone(), date, scan.assets))
}
