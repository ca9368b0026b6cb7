pub mod aggregate;
pub mod browser;
pub mod discovery;
pub mod events;
pub mod extraction;
pub mod extractor;
pub mod portal;
pub mod selectors;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::auth::LoginResult;
use crate::config::Credentials;
use crate::error::ScrapeError;
use crate::models::Route;
use extractor::TableSnapshot;

pub use aggregate::aggregate;
pub use discovery::discover_incomplete_routes;
pub use events::{EventSink, LogLevel, ScrapeEvent, TracingSink};
pub use extraction::extract_assets;
pub use portal::PortalSession;

/// Page-level operations the confirmation workflow performs against the portal.
///
/// One implementation drives a real browser; tests substitute an in-memory one.
#[async_trait]
pub trait Portal: Send {
    async fn login(&mut self, credentials: &Credentials) -> Result<LoginResult, ScrapeError>;

    /// Opens the routes summary for `date`, failing with `Navigation` when the
    /// view does not load.
    async fn open_summary(&mut self, date: NaiveDate) -> Result<(), ScrapeError>;

    async fn summary_table(&mut self) -> Result<TableSnapshot, ScrapeError>;

    /// Follows the route's missing-count link. `Ok(false)` when no link exists.
    async fn open_route_detail(&mut self, route: &Route) -> Result<bool, ScrapeError>;

    async fn detail_table(&mut self) -> Result<TableSnapshot, ScrapeError>;

    async fn return_to_summary(&mut self) -> Result<(), ScrapeError>;

    /// Tears the session down. Must tolerate repeated calls.
    async fn close(&mut self) -> Result<(), ScrapeError>;
}
