use crate::auth::AuthenticationStage;
use crate::navigation::ReportNavigationStage;
use crate::window::ReportTimeWindow;
use chrono::NaiveDate;
use nightshift_common::{NightshiftError, Result};
use nightshift_config::NightshiftConfig;
use nightshift_drivers::BrowserSession;
use nightshift_notify::{Delivery, Notification, Notifier};
use nightshift_ocr::OcrEngine;
use nightshift_report::{normalize_download_name, DownloadWatcher, TabularAggregator};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub artifact: PathBuf,
    /// `None` when delivery was attempted and failed.
    pub delivery: Option<Delivery>,
    pub artifact_removed: bool,
    pub login_attempts: usize,
}

/// Collaborators for one run. The browser session is owned by the caller but
/// always closed by [`Pipeline::run`].
pub struct Pipeline<'a> {
    config: &'a NightshiftConfig,
    ocr: &'a dyn OcrEngine,
    notifier: &'a dyn Notifier,
    download_dir: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a NightshiftConfig,
        ocr: &'a dyn OcrEngine,
        notifier: &'a dyn Notifier,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            ocr,
            notifier,
            download_dir: download_dir.into(),
        }
    }

    /// Run every stage for `run_date`. On failure the stuck page is captured
    /// and the operator notified before the error is returned.
    pub async fn run<S: BrowserSession>(
        &self,
        session: &S,
        run_date: NaiveDate,
    ) -> Result<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, %run_date);
        async {
            info!(target: "pipeline", "started night shift report run");
            let result = match self.execute(session, run_date).await {
                Ok(outcome) => Ok(outcome),
                Err(err) => {
                    error!(target: "pipeline", error = %err, "process failed");
                    let screenshot = capture_diagnostics(
                        session,
                        &self.config.diagnostics.screenshot_path,
                    )
                    .await;
                    notify_failure(self.config, self.notifier, &err, screenshot.as_deref()).await;
                    Err(err)
                }
            };
            if let Err(err) = session.close().await {
                warn!(target: "pipeline", error = %err, "failed to close browser session");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute<S: BrowserSession>(
        &self,
        session: &S,
        run_date: NaiveDate,
    ) -> Result<PipelineOutcome> {
        let cfg = self.config;

        let attempts = AuthenticationStage::new(&cfg.portal, &cfg.login)
            .run(session, self.ocr)
            .await?;

        let window = ReportTimeWindow::for_run_date(run_date);
        ReportNavigationStage::new(&cfg.report, &cfg.login, window)
            .run(session)
            .await?;

        let downloaded = DownloadWatcher::from_config(&cfg.downloads, &self.download_dir)
            .wait_for_download()
            .await?;
        info!(target: "pipeline", file = %downloaded.display(), "file downloaded");
        let renamed = normalize_download_name(&downloaded, &cfg.summary.renamed_stem, run_date);

        let aggregator = TabularAggregator::new(cfg.summary.clone());
        let input = renamed.clone();
        let artifact = tokio::task::spawn_blocking(move || aggregator.summarize(&input))
            .await
            .unwrap_or_else(|err| {
                error!(target: "pipeline", error = %err, "summary task aborted");
                renamed
            });

        let notification = Notification::new(
            format!("{}: {}", cfg.notify.success_subject, run_date.format("%Y-%m-%d")),
            cfg.notify.success_body.clone(),
        )
        .with_attachment(&artifact);
        let delivery = match self.notifier.notify(&notification).await {
            Ok(delivery) => Some(delivery),
            Err(err) => {
                error!(target: "pipeline", error = %err, "failed to send report");
                None
            }
        };

        let artifact_removed = delivery == Some(Delivery::Sent) && remove_artifact(&artifact).await;

        Ok(PipelineOutcome {
            artifact,
            delivery,
            artifact_removed,
            login_attempts: attempts.len(),
        })
    }
}

/// Capture the whole page of the most recently opened tab to `path`.
pub async fn capture_diagnostics<S: BrowserSession>(session: &S, path: &Path) -> Option<PathBuf> {
    let capture = async {
        if let Some(last) = session.page_handles().await?.last() {
            session.switch_to(last).await?;
        }
        let png = session.full_page_screenshot().await?;
        tokio::fs::write(path, png).await?;
        Ok::<_, NightshiftError>(())
    };
    match capture.await {
        Ok(()) => {
            info!(target: "pipeline", path = %path.display(), "diagnostic screenshot saved");
            Some(path.to_path_buf())
        }
        Err(err) => {
            warn!(target: "pipeline", error = %err, "diagnostic screenshot failed");
            None
        }
    }
}

/// Tell the operator a run failed. Delivery problems are only logged.
pub async fn notify_failure(
    config: &NightshiftConfig,
    notifier: &dyn Notifier,
    err: &NightshiftError,
    screenshot: Option<&Path>,
) {
    let mut notification = Notification::new(
        config.notify.failure_subject.clone(),
        format!("Error details: {err}"),
    );
    if let Some(path) = screenshot {
        notification = notification.with_attachment(path);
    }
    if let Err(send_err) = notifier.notify(&notification).await {
        error!(target: "pipeline", error = %send_err, "failed to send failure notification");
    }
}

async fn remove_artifact(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!(target: "pipeline", path = %path.display(), "artifact deleted");
            true
        }
        Err(err) => {
            warn!(target: "pipeline", path = %path.display(), error = %err, "could not delete artifact");
            false
        }
    }
}
