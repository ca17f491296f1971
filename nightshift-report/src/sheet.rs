//! Format-neutral workbook model plus the readers and writer around it.
use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use chrono::NaiveDateTime;
use nightshift_common::{NightshiftError, Result};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook, Worksheet};
use std::fmt;
use std::path::Path;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MIN_COLUMN_WIDTH: usize = 10;
const HEADER_FILL: u32 = 0xD3D3D3;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(flag) => write!(f, "{}", if *flag { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format(DATE_FORMAT)),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Float(n) => CellValue::Number(*n),
            Data::Int(n) => CellValue::Number(*n as f64),
            Data::Bool(flag) => CellValue::Bool(*flag),
            Data::DateTime(_) | Data::DateTimeIso(_) => cell
                .as_datetime()
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(cell.to_string())),
            other => CellValue::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Rendered width per column: longest value plus padding, floored.
    pub fn column_widths(&self) -> Vec<usize> {
        (0..self.width())
            .map(|col| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                if longest < MIN_COLUMN_WIDTH {
                    MIN_COLUMN_WIDTH
                } else {
                    longest + 2
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkbookData {
    pub sheets: Vec<SheetData>,
}

impl WorkbookData {
    /// Read every sheet of a spreadsheet, or the single table of a CSV file.
    pub fn read(path: &Path) -> Result<Self> {
        if has_extension(path, "csv") {
            return read_csv(path);
        }

        let mut workbook = open_workbook_auto(path).map_err(aggregation)?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name).map_err(aggregation)?;
            sheets.push(SheetData::new(name, anchored_rows(&range)));
        }
        if sheets.is_empty() {
            return Err(NightshiftError::Aggregation(format!(
                "{} has no sheets",
                path.display()
            )));
        }
        Ok(Self { sheets })
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetData> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Write as `.xlsx`. Sheets named in `formatted` get the report styling;
    /// the rest are copied as plain values.
    pub fn write_xlsx(&self, path: &Path, formatted: &[&str]) -> Result<()> {
        let mut workbook = Workbook::new();
        for sheet in &self.sheets {
            let worksheet = if formatted.contains(&sheet.name.as_str()) {
                styled_worksheet(sheet)
            } else {
                plain_worksheet(sheet)
            }
            .map_err(aggregation)?;
            workbook.push_worksheet(worksheet);
        }
        workbook.save(path).map_err(aggregation)
    }
}

/// Rows of `range` indexed from A1. calamine ranges begin at the first used
/// cell, so leading blank rows and columns are restored as empty cells.
fn anchored_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let leading = vec![CellValue::Empty; first_col as usize];
    let mut rows: Vec<Vec<CellValue>> = (0..first_row).map(|_| Vec::new()).collect();
    rows.extend(range.rows().map(|row| {
        leading
            .iter()
            .cloned()
            .chain(row.iter().map(CellValue::from))
            .collect()
    }));
    rows
}

fn read_csv(path: &Path) -> Result<WorkbookData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(aggregation)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(aggregation)?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    let field = field.trim_start_matches('\u{feff}');
                    if field.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(WorkbookData {
        sheets: vec![SheetData::new("Sheet1", rows)],
    })
}

fn styled_worksheet(sheet: &SheetData) -> std::result::Result<Worksheet, rust_xlsxwriter::XlsxError> {
    let body = Format::new().set_border(FormatBorder::Thin);
    let header = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_border(FormatBorder::Thin);

    let mut worksheet = Worksheet::new();
    worksheet.set_name(&sheet.name)?;
    let width = sheet.width();
    for (r, row) in sheet.rows.iter().enumerate() {
        let format = if r == 0 { &header } else { &body };
        for c in 0..width {
            let cell = row.get(c).unwrap_or(&CellValue::Empty);
            write_cell(&mut worksheet, r as u32, c as u16, cell, Some(format))?;
        }
    }
    for (c, chars) in sheet.column_widths().into_iter().enumerate() {
        worksheet.set_column_width(c as u16, chars as f64)?;
    }
    Ok(worksheet)
}

fn plain_worksheet(sheet: &SheetData) -> std::result::Result<Worksheet, rust_xlsxwriter::XlsxError> {
    let mut worksheet = Worksheet::new();
    worksheet.set_name(&sheet.name)?;
    for (r, row) in sheet.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            write_cell(&mut worksheet, r as u32, c as u16, cell, None)?;
        }
    }
    Ok(worksheet)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
    format: Option<&Format>,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    match (cell, format) {
        (CellValue::Empty, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::Empty, None) => {}
        (CellValue::Number(n), Some(format)) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        (CellValue::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
        (CellValue::Bool(flag), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *flag, format)?;
        }
        (CellValue::Bool(flag), None) => {
            worksheet.write_boolean(row, col, *flag)?;
        }
        (other, Some(format)) => {
            worksheet.write_string_with_format(row, col, other.to_string(), format)?;
        }
        (other, None) => {
            worksheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}

pub(crate) fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

fn aggregation(err: impl fmt::Display) -> NightshiftError {
    NightshiftError::Aggregation(err.to_string())
}
