//! Everything that happens to the exported report once the browser is done:
//! waiting for the file to land ([`watch`]), giving it a usable name
//! ([`rename`]), and summarising it ([`aggregate`]).
pub mod aggregate;
pub mod pivot;
pub mod rename;
pub mod sheet;
pub mod watch;

pub use aggregate::TabularAggregator;
pub use pivot::{ColumnLayout, PivotTable};
pub use rename::normalize_download_name;
pub use sheet::{CellValue, SheetData, WorkbookData};
pub use watch::{DownloadCandidate, DownloadWatcher};
