use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Day whose inventory is being confirmed: Friday when run on a Monday,
/// otherwise the previous day.
pub fn target_date(today: NaiveDate) -> NaiveDate {
    let days_back = if today.weekday() == Weekday::Mon { 3 } else { 1 };
    today - Duration::days(days_back)
}

/// A route flagged on the summary view with a nonzero missing count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub missing_count: u32,
}

impl Route {
    pub fn new(name: impl Into<String>, missing_count: u32) -> Self {
        Self {
            name: name.into(),
            missing_count,
        }
    }

    /// Route name with inner whitespace collapsed, as rendered in link text.
    pub fn normalized_name(&self) -> String {
        self.name.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub location: String,
    pub asset_type: String,
    pub restock_time: String,
    pub inventory_taken: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    Incomplete,
    NoLinkFound,
    Error,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "Incomplete"),
            Self::NoLinkFound => write!(f, "No Link Found"),
            Self::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub route: Route,
    pub date: NaiveDate,
    pub status: RouteStatus,
    pub assets: Vec<Asset>,
    pub error: Option<String>,
}

impl RouteResult {
    pub fn incomplete(route: Route, date: NaiveDate, assets: Vec<Asset>) -> Self {
        Self {
            route,
            date,
            status: RouteStatus::Incomplete,
            assets,
            error: None,
        }
    }

    pub fn no_link(route: Route, date: NaiveDate) -> Self {
        Self {
            route,
            date,
            status: RouteStatus::NoLinkFound,
            assets: Vec::new(),
            error: None,
        }
    }

    pub fn failed(route: Route, date: NaiveDate, error: impl Into<String>) -> Self {
        Self {
            route,
            date,
            status: RouteStatus::Error,
            assets: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// One output row handed to the report writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub route: String,
    pub date: NaiveDate,
    pub asset_id: String,
    pub location: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub restock_time: String,
    pub inventory_taken: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationReport {
    pub target_date: NaiveDate,
    pub generated_at: chrono::DateTime<chrono::Local>,
    pub routes: Vec<RouteResult>,
    pub records: Vec<AssetRecord>,
    pub elapsed_secs: f64,
}

impl ConfirmationReport {
    pub fn routes_found(&self) -> usize {
        self.routes.len()
    }

    pub fn failed_routes(&self) -> impl Iterator<Item = &RouteResult> {
        self.routes
            .iter()
            .filter(|r| r.status != RouteStatus::Incomplete)
    }
}
