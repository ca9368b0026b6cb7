pub mod excel;
pub mod csv;
pub mod json;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::models::ConfirmationReport;

pub const RECORD_HEADERS: [&str; 7] = [
    "Route",
    "Date",
    "Asset ID",
    "Location",
    "Type",
    "Restock Time",
    "Inventory Taken",
];

pub trait Exporter {
    fn extension(&self) -> &'static str;

    fn export(&self, report: &ConfirmationReport, path: &Path) -> Result<()>;
}

/// `Daily Inventory Confirmation MM.DD.YY`, dated by when the report was generated.
pub fn report_stem(report: &ConfirmationReport) -> String {
    format!(
        "Daily Inventory Confirmation {}",
        report.generated_at.format("%m.%d.%y")
    )
}

/// Writes every enabled format into `output_dir`, returning the files written.
pub fn export_report(
    report: &ConfirmationReport,
    config: &AppConfig,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut exporters: Vec<Box<dyn Exporter>> = Vec::new();
    if config.export_excel {
        exporters.push(Box::new(excel::ExcelExporter));
    }
    if config.export_csv {
        exporters.push(Box::new(csv::CsvExporter::new()));
    }
    if config.export_json {
        exporters.push(Box::new(json::JsonExporter::new()));
    }

    let stem = report_stem(report);
    let mut written = Vec::with_capacity(exporters.len());
    for exporter in exporters {
        let path = output_dir.join(format!("{}.{}", stem, exporter.extension()));
        exporter
            .export(report, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}
