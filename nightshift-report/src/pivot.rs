use crate::sheet::CellValue;
use nightshift_config::SummaryConfig;
use std::collections::{BTreeMap, BTreeSet};

/// Positions of the two key columns in the primary sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub plate: usize,
    pub alert_type: usize,
    /// The plate column was not recognised by header and defaulted.
    pub plate_defaulted: bool,
    pub type_defaulted: bool,
}

impl ColumnLayout {
    pub const FALLBACK_PLATE: usize = 0;
    pub const FALLBACK_TYPE: usize = 1;

    /// Scan the header row left to right; the first header containing one of
    /// the configured substrings wins its column.
    pub fn detect(header: &[CellValue], cfg: &SummaryConfig) -> Self {
        let find = |keys: &[String]| {
            header.iter().position(|cell| {
                let text = cell.to_string();
                let text = text.trim();
                !text.is_empty() && keys.iter().any(|key| text.contains(key.as_str()))
            })
        };
        let plate = find(&cfg.plate_header_keys);
        let alert_type = find(&cfg.type_header_keys);
        Self {
            plate: plate.unwrap_or(Self::FALLBACK_PLATE),
            alert_type: alert_type.unwrap_or(Self::FALLBACK_TYPE),
            plate_defaulted: plate.is_none(),
            type_defaulted: alert_type.is_none(),
        }
    }
}

/// Occurrence counts per plate and alert type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotTable {
    counts: BTreeMap<String, BTreeMap<String, u32>>,
    alert_types: BTreeSet<String>,
}

impl PivotTable {
    /// Count data rows (header excluded). Rows missing either key are skipped.
    pub fn from_rows<'a>(
        rows: impl IntoIterator<Item = &'a Vec<CellValue>>,
        layout: ColumnLayout,
    ) -> Self {
        let mut table = Self::default();
        for row in rows {
            let key = |index: usize| {
                row.get(index)
                    .map(|cell| cell.to_string().trim().to_string())
                    .filter(|text| !text.is_empty())
            };
            if let (Some(plate), Some(alert_type)) = (key(layout.plate), key(layout.alert_type)) {
                table.record(plate, alert_type);
            }
        }
        table
    }

    pub fn record(&mut self, plate: impl Into<String>, alert_type: impl Into<String>) {
        let alert_type = alert_type.into();
        *self
            .counts
            .entry(plate.into())
            .or_default()
            .entry(alert_type.clone())
            .or_insert(0) += 1;
        self.alert_types.insert(alert_type);
    }

    /// Distinct alert types, sorted; this is the summary's column order.
    pub fn alert_types(&self) -> impl Iterator<Item = &str> {
        self.alert_types.iter().map(String::as_str)
    }

    pub fn plates(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn count(&self, plate: &str, alert_type: &str) -> u32 {
        self.counts
            .get(plate)
            .and_then(|types| types.get(alert_type))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, plate: &str) -> u32 {
        self.counts
            .get(plate)
            .map(|types| types.values().sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Header row `[plate_label, types.., total_label]` followed by one row
    /// per plate.
    pub fn to_rows(&self, plate_label: &str, total_label: &str) -> Vec<Vec<CellValue>> {
        let mut header = vec![CellValue::Text(plate_label.to_string())];
        header.extend(self.alert_types().map(|t| CellValue::Text(t.to_string())));
        header.push(CellValue::Text(total_label.to_string()));

        let mut rows = vec![header];
        for plate in self.plates() {
            let mut row = vec![CellValue::Text(plate.to_string())];
            row.extend(
                self.alert_types()
                    .map(|t| CellValue::Number(f64::from(self.count(plate, t)))),
            );
            row.push(CellValue::Number(f64::from(self.total(plate))));
            rows.push(row);
        }
        rows
    }
}
