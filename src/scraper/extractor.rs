use serde::{Deserialize, Serialize};

use crate::models::{Asset, Route};

/// Cell texts of every `tr` in a page's tables, captured in one script call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    rows: Vec<Vec<String>>,
}

impl TableSnapshot {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Trimmed text of a cell, `None` when the row or column is absent.
    pub fn cell(&self, row: usize, index: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(index))
            .map(|text| text.trim())
    }

    pub fn cell_count(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }
}

/// Where route data lives on the routes summary view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryLayout {
    /// Non-data rows preceding the first route row.
    pub header_rows: usize,
    pub name_column: usize,
    pub count_column: usize,
    pub route_prefix: String,
}

impl Default for SummaryLayout {
    fn default() -> Self {
        Self {
            header_rows: 6,
            name_column: 1,
            count_column: 4,
            route_prefix: "Rt".to_string(),
        }
    }
}

impl SummaryLayout {
    pub fn min_cells(&self) -> usize {
        self.name_column.max(self.count_column) + 1
    }
}

/// Strictly numeric count cell; anything else is treated as absent.
pub fn parse_missing_count(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSummaryRow {
    pub route_name: String,
    pub missing_count: Option<u32>,
}

impl RouteSummaryRow {
    pub fn is_incomplete(&self) -> bool {
        self.missing_count.is_some_and(|count| count > 0)
    }
}

pub struct SummaryPage<'a> {
    table: &'a TableSnapshot,
    layout: &'a SummaryLayout,
}

impl<'a> SummaryPage<'a> {
    pub fn new(table: &'a TableSnapshot, layout: &'a SummaryLayout) -> Self {
        Self { table, layout }
    }

    /// Rows whose name cell starts with the route prefix. Short rows are skipped.
    pub fn route_rows(&self) -> Vec<RouteSummaryRow> {
        (self.layout.header_rows..self.table.len())
            .filter(|&row| self.table.cell_count(row) >= self.layout.min_cells())
            .filter_map(|row| {
                let name = self.table.cell(row, self.layout.name_column)?;
                if !name.starts_with(&self.layout.route_prefix) {
                    return None;
                }
                let count = self.table.cell(row, self.layout.count_column)?;
                Some(RouteSummaryRow {
                    route_name: name.to_string(),
                    missing_count: parse_missing_count(count),
                })
            })
            .collect()
    }

    /// Routes with a positive missing count, in table order.
    pub fn incomplete_routes(&self) -> Vec<Route> {
        self.route_rows()
            .into_iter()
            .filter(RouteSummaryRow::is_incomplete)
            .map(|row| Route::new(row.route_name, row.missing_count.unwrap_or_default()))
            .collect()
    }
}

/// Column layout of a route's asset detail table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailLayout {
    pub asset_id_column: usize,
    pub location_column: usize,
    pub type_column: usize,
    pub status_column: usize,
    /// Read when present, blank otherwise.
    pub restock_column: usize,
    /// Status text of an asset whose inventory has not been recorded.
    pub placeholder: String,
}

impl Default for DetailLayout {
    fn default() -> Self {
        Self {
            asset_id_column: 0,
            location_column: 1,
            type_column: 2,
            status_column: 3,
            restock_column: 4,
            placeholder: "--".to_string(),
        }
    }
}

impl DetailLayout {
    pub fn min_cells(&self) -> usize {
        [
            self.asset_id_column,
            self.location_column,
            self.type_column,
            self.status_column,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
            + 1
    }

    pub fn needs_confirmation(&self, status: &str) -> bool {
        status.trim() == self.placeholder.trim()
    }
}

/// Asset categories that never require confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ExclusionRules {
    keywords: Vec<String>,
}

impl From<Vec<String>> for ExclusionRules {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<ExclusionRules> for Vec<String> {
    fn from(rules: ExclusionRules) -> Self {
        rules.keywords
    }
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self::new(["FF", "STATIC", "COFFEE", "CONDIMENTS"])
    }
}

impl ExclusionRules {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::<String>::into)
                .filter(|k| !k.trim().is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_excluded(&self, asset_id: &str, asset_type: &str) -> bool {
        let haystack = format!("{asset_id} {asset_type}").to_uppercase();
        self.keywords
            .iter()
            .any(|keyword| haystack.contains(&keyword.trim().to_uppercase()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailScan {
    pub assets: Vec<Asset>,
    pub excluded: Vec<String>,
}

pub struct DetailPage<'a> {
    table: &'a TableSnapshot,
    layout: &'a DetailLayout,
}

impl<'a> DetailPage<'a> {
    pub fn new(table: &'a TableSnapshot, layout: &'a DetailLayout) -> Self {
        Self { table, layout }
    }

    /// Placeholder-status rows, split into kept assets and excluded asset ids.
    pub fn pending_assets(&self, rules: &ExclusionRules) -> DetailScan {
        let layout = self.layout;
        let mut scan = DetailScan::default();

        for row in 0..self.table.len() {
            if self.table.cell_count(row) < layout.min_cells() {
                continue;
            }
            let cell = |index| self.table.cell(row, index).unwrap_or_default().to_string();

            let status = cell(layout.status_column);
            if !layout.needs_confirmation(&status) {
                continue;
            }

            let asset = Asset {
                asset_id: cell(layout.asset_id_column),
                location: cell(layout.location_column),
                asset_type: cell(layout.type_column),
                restock_time: cell(layout.restock_column),
                inventory_taken: status,
            };

            if rules.is_excluded(&asset.asset_id, &asset.asset_type) {
                scan.excluded.push(asset.asset_id);
            } else {
                scan.assets.push(asset);
            }
        }

        scan
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod extractor_test;
