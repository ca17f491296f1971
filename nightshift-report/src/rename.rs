use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SPREADSHEET_EXTENSIONS: [&str; 3] = ["xls", "xlsx", "csv"];

/// Give an export with a missing or unexpected extension a dated `.xls`
/// name in the same directory. Readable files are returned as they are, and
/// so is the original path when the rename fails.
pub fn normalize_download_name(path: &Path, stem: &str, date: NaiveDate) -> PathBuf {
    let readable = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        });
    if readable {
        return path.to_path_buf();
    }

    let target = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}_{}.xls", date.format("%Y-%m-%d")));
    if target.exists() {
        if let Err(err) = std::fs::remove_file(&target) {
            warn!(target: "report.watch", path = %target.display(), error = %err, "could not replace existing file");
        }
    }
    match std::fs::rename(path, &target) {
        Ok(()) => {
            info!(target: "report.watch", from = %path.display(), to = %target.display(), "renamed download");
            target
        }
        Err(err) => {
            warn!(target: "report.watch", path = %path.display(), error = %err, "rename failed");
            path.to_path_buf()
        }
    }
}
