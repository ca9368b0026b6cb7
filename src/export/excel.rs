use anyhow::Result;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

use super::{Exporter, RECORD_HEADERS};
use crate::models::ConfirmationReport;

pub const RECORDS_SHEET: &str = "Inventory Confirmation";
pub const ROUTES_SHEET: &str = "Routes";
pub const METADATA_SHEET: &str = "Metadata";

pub struct ExcelExporter;

impl Exporter for ExcelExporter {
    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn export(&self, report: &ConfirmationReport, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(RECORDS_SHEET)?;
        write_header(worksheet, &RECORD_HEADERS, &header)?;

        for (col, width) in [10, 12, 15, 30, 15, 14, 16].into_iter().enumerate() {
            worksheet.set_column_width(col as u16, width)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        for (row_num, record) in report.records.iter().enumerate() {
            let row = (row_num + 1) as u32;
            worksheet.write(row, 0, &record.route)?;
            worksheet.write(row, 1, record.date.format("%Y-%m-%d").to_string())?;
            worksheet.write(row, 2, &record.asset_id)?;
            worksheet.write(row, 3, &record.location)?;
            worksheet.write(row, 4, &record.asset_type)?;
            worksheet.write(row, 5, &record.restock_time)?;
            worksheet.write(row, 6, &record.inventory_taken)?;
        }
        if !report.records.is_empty() {
            worksheet.autofilter(0, 0, report.records.len() as u32, 6)?;
        }

        self.create_routes_sheet(&mut workbook, report, &header)?;
        self.create_metadata_sheet(&mut workbook, report)?;

        workbook.save(path)?;
        Ok(())
    }
}

impl ExcelExporter {
    /// One row per discovered route so failed routes stay visible.
    fn create_routes_sheet(
        &self,
        workbook: &mut Workbook,
        report: &ConfirmationReport,
        header: &Format,
    ) -> Result<()> {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(ROUTES_SHEET)?;
        write_header(
            worksheet,
            &["Route", "Missing Inventory", "Status", "Assets Listed", "Error"],
            header,
        )?;
        worksheet.set_column_width(0, 12)?;
        worksheet.set_column_width(2, 16)?;
        worksheet.set_column_width(4, 50)?;

        for (row_num, result) in report.routes.iter().enumerate() {
            let row = (row_num + 1) as u32;
            worksheet.write(row, 0, &result.route.name)?;
            worksheet.write(row, 1, result.route.missing_count as f64)?;
            worksheet.write(row, 2, result.status.to_string())?;
            worksheet.write(row, 3, result.assets.len() as f64)?;
            worksheet.write(row, 4, result.error.as_deref().unwrap_or_default())?;
        }

        Ok(())
    }

    fn create_metadata_sheet(&self, workbook: &mut Workbook, report: &ConfirmationReport) -> Result<()> {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(METADATA_SHEET)?;
        worksheet.set_column_width(0, 20)?;
        worksheet.set_column_width(1, 24)?;

        worksheet.write(0, 0, "Target Date")?;
        worksheet.write(0, 1, report.target_date.format("%Y-%m-%d").to_string())?;
        worksheet.write(1, 0, "Generated")?;
        worksheet.write(1, 1, report.generated_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
        worksheet.write(2, 0, "Routes Found")?;
        worksheet.write(2, 1, report.routes_found() as f64)?;
        worksheet.write(3, 0, "Incomplete Assets")?;
        worksheet.write(3, 1, report.records.len() as f64)?;
        worksheet.write(4, 0, "Elapsed Seconds")?;
        worksheet.write(4, 1, report.elapsed_secs)?;

        Ok(())
    }
}

fn write_header(worksheet: &mut Worksheet, headers: &[&str], format: &Format) -> Result<()> {
    for (col, title) in headers.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, *title, format)?;
    }
    Ok(())
}
