use anyhow::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{Exporter, RECORD_HEADERS};
use crate::models::ConfirmationReport;

pub struct CsvExporter {
    delimiter: u8,
    with_bom: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: b',',
            with_bom: true, // Excel reads UTF-8 only with a BOM
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_bom(mut self, with_bom: bool) -> Self {
        self.with_bom = with_bom;
        self
    }
}

impl Exporter for CsvExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, report: &ConfirmationReport, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        if self.with_bom {
            file.write_all(&[0xEF, 0xBB, 0xBF])?;
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(file);
        writer.write_record(RECORD_HEADERS)?;

        for record in &report.records {
            let date = record.date.format("%Y-%m-%d").to_string();
            writer.write_record([
                record.route.as_str(),
                date.as_str(),
                record.asset_id.as_str(),
                record.location.as_str(),
                record.asset_type.as_str(),
                record.restock_time.as_str(),
                record.inventory_taken.as_str(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}
