use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use nightshift_common::observability::{init_logging, LogConfig, LogFormat};
use nightshift_config::{NightshiftConfig, NightshiftConfigLoader};
use nightshift_drivers::browser::driver::NightshiftDriver;
use nightshift_notify::build_notifier;
use nightshift_ocr::tesseract::TesseractOcr;
use nightshift_pipeline::{notify_failure, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_FILE: &str = "nightshift.yaml";

/// Nightly DMS report: log in, export, summarise, mail.
#[derive(Debug, Parser)]
#[command(name = "nightshift", version)]
struct Args {
    /// YAML configuration file (defaults to ./nightshift.yaml when present).
    #[arg(long, env = "NIGHTSHIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Show the browser window.
    #[arg(long)]
    headed: bool,

    /// Directory for the rolling log file.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Write JSON log lines instead of text.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("nightshift: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let loader = match &args.config {
        Some(path) => NightshiftConfigLoader::new().with_file(path),
        None => NightshiftConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg: NightshiftConfig = loader.load().context("loading configuration")?;
    if args.headed {
        cfg.browser.headless = false;
    }

    let log_path = init_logging(LogConfig {
        log_dir: args.log_dir.clone(),
        format: if args.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        ..LogConfig::default()
    })?;
    info!(log = %log_path.display(), "started GPS report automation (night shift)");

    std::fs::create_dir_all(&cfg.downloads.directory).with_context(|| {
        format!("creating download directory {}", cfg.downloads.directory.display())
    })?;
    let download_dir = cfg.downloads.directory.canonicalize()?;

    let ocr = TesseractOcr::new(&cfg.ocr);
    if let Err(err) = ocr.probe().await {
        warn!(error = %err, "captcha recognition will fail");
    }
    let notifier = build_notifier(&cfg.notify);

    let driver = match NightshiftDriver::launch(&cfg.browser, &download_dir).await {
        Ok(driver) => driver,
        Err(err) => {
            notify_failure(&cfg, notifier.as_ref(), &err, None).await;
            return Err(err.into());
        }
    };

    let pipeline = Pipeline::new(&cfg, &ocr, notifier.as_ref(), download_dir);
    let outcome = pipeline.run(&driver, Local::now().date_naive()).await?;
    info!(
        artifact = %outcome.artifact.display(),
        delivery = ?outcome.delivery,
        removed = outcome.artifact_removed,
        "run complete"
    );
    Ok(())
}
