use chrono::NaiveDate;

use super::events::{EventSink, ScrapeEvent};
use super::extractor::{SummaryLayout, SummaryPage};
use super::Portal;
use crate::error::ScrapeError;
use crate::models::Route;

/// Opens the summary for `date` and lists routes with missing inventory,
/// top to bottom. Any failure here aborts the run.
pub async fn discover_incomplete_routes<P>(
    portal: &mut P,
    date: NaiveDate,
    layout: &SummaryLayout,
    events: &dyn EventSink,
) -> Result<Vec<Route>, ScrapeError>
where
    P: Portal + ?Sized,
{
    portal.open_summary(date).await?;
    events.emit(&ScrapeEvent::SummaryOpened { date });

    let table = portal.summary_table().await?;
    let routes = SummaryPage::new(&table, layout).incomplete_routes();

    for route in &routes {
        events.emit(&ScrapeEvent::RouteDiscovered {
            route: route.name.clone(),
            missing: route.missing_count,
        });
    }
    events.emit(&ScrapeEvent::DiscoveryFinished {
        routes: routes.len(),
    });

    Ok(routes)
}
