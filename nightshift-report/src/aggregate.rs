use crate::pivot::{ColumnLayout, PivotTable};
use crate::sheet::{has_extension, SheetData, WorkbookData};
use nightshift_common::{NightshiftError, Result};
use nightshift_config::SummaryConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Adds the per-plate summary sheet to a downloaded report.
#[derive(Debug, Clone)]
pub struct TabularAggregator {
    cfg: SummaryConfig,
}

impl TabularAggregator {
    pub fn new(cfg: SummaryConfig) -> Self {
        Self { cfg }
    }

    /// Summarise `path`, returning the artifact to deliver.
    ///
    /// Never fails: when anything goes wrong the problem is logged and the
    /// original file is returned untouched.
    pub fn summarize(&self, path: &Path) -> PathBuf {
        match self.aggregate(path) {
            Ok(output) => output,
            Err(err) => {
                error!(
                    target: "report.aggregate",
                    path = %path.display(),
                    error = %err,
                    "summary failed, delivering the original file"
                );
                path.to_path_buf()
            }
        }
    }

    /// Fallible core of [`Self::summarize`]. The output is always `.xlsx`,
    /// next to the input.
    pub fn aggregate(&self, path: &Path) -> Result<PathBuf> {
        info!(target: "report.aggregate", path = %path.display(), "processing report");
        let mut workbook = WorkbookData::read(path)?;

        let primary = workbook
            .sheets
            .iter()
            .find(|sheet| sheet.name != self.cfg.sheet_name)
            .ok_or_else(|| {
                NightshiftError::Aggregation(format!("{} has no data sheet", path.display()))
            })?;
        let primary_name = primary.name.clone();

        let summary = self.summary_sheet(primary);
        workbook
            .sheets
            .retain(|sheet| sheet.name != self.cfg.sheet_name);
        workbook.sheets.push(summary);

        let output = if has_extension(path, "xlsx") {
            path.to_path_buf()
        } else {
            path.with_extension("xlsx")
        };
        workbook.write_xlsx(&output, &[primary_name.as_str(), self.cfg.sheet_name.as_str()])?;
        info!(target: "report.aggregate", output = %output.display(), "summary written");
        Ok(output)
    }

    fn summary_sheet(&self, primary: &SheetData) -> SheetData {
        let header = primary.rows.first().map(Vec::as_slice).unwrap_or_default();
        let layout = ColumnLayout::detect(header, &self.cfg);
        let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
        info!(target: "report.aggregate", ?headers, "headers found");
        if layout.plate_defaulted {
            warn!(
                target: "report.aggregate",
                column = layout.plate,
                "plate header not found, using positional column"
            );
        }
        if layout.type_defaulted {
            warn!(
                target: "report.aggregate",
                column = layout.alert_type,
                "alert type header not found, using positional column"
            );
        }

        let data_rows = primary.rows.iter().skip(1);
        let table = PivotTable::from_rows(data_rows.clone(), layout);
        let non_blank = data_rows
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .count();
        if table.is_empty() && non_blank > 0 {
            warn!(
                target: "report.aggregate",
                rows = non_blank,
                "no row had both a plate and an alert type; summary is empty"
            );
        }

        SheetData::new(
            self.cfg.sheet_name.clone(),
            table.to_rows(&self.cfg.plate_label, &self.cfg.total_label),
        )
    }
}
