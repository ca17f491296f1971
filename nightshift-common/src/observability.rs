//! Logging setup shared by the binary and the integration tests.
//!
//! Events go to a daily rolling file and, optionally, to stderr. The first
//! call to [`init_logging`] installs the global subscriber; later calls get
//! the same log file path back and change nothing.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const LOG_DIR_ENV: &str = "NIGHTSHIFT_LOG_DIR";
const RETAINED_LOG_FILES: usize = 30;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Used as the log file prefix and for the default directory.
    pub app_name: &'static str,
    /// Falls back to `NIGHTSHIFT_LOG_DIR`, then `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Mirror events to stderr.
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: &'static str,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "nightshift",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "info",
        }
    }
}

/// Install the global `tracing` subscriber and return today's log file.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(config.app_name)
        .filename_suffix("log")
        .max_log_files(RETAINED_LOG_FILES)
        .build(&dir)
        .context("failed to open rolling log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let mut layers = vec![sink(file_writer, config.format, false)];
    if config.emit_stderr {
        layers.push(sink(std::io::stderr, config.format, true));
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_GUARD.set(guard);
    let path = dir.join(format!(
        "{}.{}.log",
        config.app_name,
        Local::now().format("%Y-%m-%d")
    ));
    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn sink<W>(writer: W, format: LogFormat, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .boxed(),
    }
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))
        .map(|dir| expand_home(&dir))
        .unwrap_or_else(|| match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".local/share").join(app_name),
            None => PathBuf::from(app_name),
        })
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins_and_home_is_expanded() {
        let explicit = resolve_log_dir("nightshift", Some(Path::new("/var/log/nightshift")));
        assert_eq!(explicit, PathBuf::from("/var/log/nightshift"));

        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home(Path::new("~/logs")), PathBuf::from(home).join("logs"));
        }
        assert_eq!(expand_home(Path::new("logs/~")), PathBuf::from("logs/~"));
    }
}
