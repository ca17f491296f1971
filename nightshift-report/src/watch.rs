//! Detects the exported report landing on disk.
//!
//! The browser gives no completion event we can rely on, so the watcher polls
//! the download directories and only accepts a file once two reads separated
//! by a cool-down agree on its size.
use nightshift_common::{NightshiftError, Result};
use nightshift_config::DownloadConfig;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::time::sleep;
use tracing::{debug, info};

const IN_PROGRESS_SUFFIXES: [&str; 3] = [".crdownload", ".tmp", ".part"];

/// A file seen during one poll, not yet confirmed stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCandidate {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
    pub directory_origin: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    directories: Vec<PathBuf>,
    timeout: Duration,
    poll_interval: Duration,
    confirm_delay: Duration,
    stale_grace: Duration,
}

impl DownloadWatcher {
    pub fn new(primary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            directories: vec![primary.into()],
            timeout,
            poll_interval: Duration::from_secs(2),
            confirm_delay: Duration::from_secs(3),
            stale_grace: Duration::from_secs(60),
        }
    }

    /// Watch `primary` plus, when enabled and present, the user's download
    /// directory.
    pub fn from_config(cfg: &DownloadConfig, primary: impl Into<PathBuf>) -> Self {
        let mut watcher = Self::new(primary, cfg.timeout())
            .with_poll_interval(cfg.poll_interval())
            .with_confirm_delay(cfg.confirm_delay())
            .with_stale_grace(cfg.stale_grace());
        if cfg.watch_user_downloads {
            if let Some(fallback) = cfg.fallback_directory() {
                watcher = watcher.with_directory(fallback);
            }
        }
        watcher
    }

    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if !self.directories.contains(&dir) {
            self.directories.push(dir);
        }
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    pub fn with_stale_grace(mut self, grace: Duration) -> Self {
        self.stale_grace = grace;
        self
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Poll until a fresh file holds its size across the confirmation delay.
    pub async fn wait_for_download(&self) -> Result<PathBuf> {
        info!(target: "report.watch", directories = ?self.directories, timeout = ?self.timeout, "waiting for download");
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(candidate) = self.newest_candidate() {
                if candidate.size_bytes > 0 {
                    debug!(
                        target: "report.watch",
                        path = %candidate.path.display(),
                        origin = %candidate.directory_origin.display(),
                        size = candidate.size_bytes,
                        "found potential file"
                    );
                    sleep(self.confirm_delay).await;
                    if current_size(&candidate.path) == Some(candidate.size_bytes) {
                        info!(target: "report.watch", path = %candidate.path.display(), "file confirmed");
                        return Ok(candidate.path);
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(NightshiftError::DownloadTimeout {
                    waited: self.timeout,
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    /// The most recently modified finished file across all directories,
    /// ignoring anything older than `timeout + stale_grace`.
    pub fn newest_candidate(&self) -> Option<DownloadCandidate> {
        let now = SystemTime::now();
        let horizon = self.timeout + self.stale_grace;
        self.directories
            .iter()
            .flat_map(|dir| scan_directory(dir))
            .filter(|candidate| {
                now.duration_since(candidate.modified)
                    .map(|age| age < horizon)
                    .unwrap_or(true)
            })
            .max_by_key(|candidate| candidate.modified)
    }
}

fn scan_directory(dir: &Path) -> Vec<DownloadCandidate> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.')
                || IN_PROGRESS_SUFFIXES
                    .iter()
                    .any(|suffix| name.ends_with(suffix))
            {
                return None;
            }
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some(DownloadCandidate {
                path: entry.path(),
                size_bytes: meta.len(),
                modified: meta.modified().ok()?,
                directory_origin: dir.to_path_buf(),
            })
        })
        .collect()
}

fn current_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|meta| meta.len())
}
