//! Daily inventory confirmation scrape for the SEED (Cantaloupe) portal.
//!
//! Logs in, finds every route on the routes summary with missing inventory
//! for the target date, collects the assets still awaiting confirmation and
//! hands the flattened records to the report writers.

pub mod auth;
pub mod chromedriver_manager;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod scraper;
pub mod workflow;

pub use config::AppConfig;
pub use error::ScrapeError;
pub use models::{target_date, AssetRecord, ConfirmationReport, RouteResult, RouteStatus};
pub use workflow::{run_confirmation, run_with_teardown, RunSettings};
