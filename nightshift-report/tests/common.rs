use std::sync::OnceLock;

use nightshift_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

#[allow(dead_code)]
pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "nightshift-tests",
            log_dir: Some(std::env::temp_dir().join("nightshift-tests")),
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "debug",
        };
        nightshift_common::observability::init_logging(config).unwrap_or_default()
    });
}
