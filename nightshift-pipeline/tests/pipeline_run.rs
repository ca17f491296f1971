mod common;

use chrono::NaiveDate;
use common::*;
use nightshift_common::NightshiftError;
use nightshift_notify::Delivery;
use nightshift_pipeline::Pipeline;
use nightshift_report::{CellValue, SheetData, WorkbookData};
use std::path::Path;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn drop_export(dir: &Path) -> std::path::PathBuf {
    let text = |v: &str| CellValue::Text(v.to_string());
    let path = dir.join("DMS_export.xlsx");
    WorkbookData {
        sheets: vec![SheetData::new(
            "Report",
            vec![
                vec![text("License"), text("Alarm")],
                vec![text("ABC-1"), text("Drowsy")],
                vec![text("ABC-1"), text("EyesClosed")],
                vec![text("XYZ-2"), text("Drowsy")],
            ],
        )],
    }
    .write_xlsx(&path, &[])
    .unwrap();
    path
}

fn portal_session(config: &nightshift_config::NightshiftConfig) -> FakeSession {
    let mut present = login_page();
    present.extend(report_center(&config.report));
    FakeSession::new(present)
}

#[tokio::test]
async fn successful_run_mails_and_removes_the_summary() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path().to_path_buf());
    let session = portal_session(&config);
    let ocr = ScriptedOcr::new(&["4817"]);
    let notifier = RecordingNotifier::new(Delivery::Sent);
    let export = drop_export(dir.path());

    let outcome = Pipeline::new(&config, &ocr, &notifier, dir.path())
        .run(&session, run_date())
        .await
        .unwrap();

    assert_eq!(outcome.artifact, export);
    assert_eq!(outcome.delivery, Some(Delivery::Sent));
    assert!(outcome.artifact_removed);
    assert_eq!(outcome.login_attempts, 1);
    assert!(!export.exists());
    assert!(session.closed());

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "THAI TRACKING DMS REPORT: 2024-03-15");
    assert!(sent[0].body.contains("18:00"));
    assert_eq!(sent[0].attachment.as_deref(), Some(export.as_path()));
}

#[tokio::test]
async fn skipped_delivery_keeps_the_artifact() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path().to_path_buf());
    let session = portal_session(&config);
    let ocr = ScriptedOcr::new(&["4817"]);
    let notifier = RecordingNotifier::new(Delivery::Skipped);
    let export = drop_export(dir.path());

    let outcome = Pipeline::new(&config, &ocr, &notifier, dir.path())
        .run(&session, run_date())
        .await
        .unwrap();

    assert!(!outcome.artifact_removed);
    assert!(export.exists());
    let summary = WorkbookData::read(&export).unwrap();
    assert!(summary.sheet("Summary_Pivot").is_some());
}

#[tokio::test]
async fn delivery_failure_keeps_the_artifact_and_the_run_succeeds() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path().to_path_buf());
    let session = portal_session(&config);
    let ocr = ScriptedOcr::new(&["4817"]);
    let notifier = RecordingNotifier::failing();
    let export = drop_export(dir.path());

    let outcome = Pipeline::new(&config, &ocr, &notifier, dir.path())
        .run(&session, run_date())
        .await
        .unwrap();

    assert_eq!(outcome.delivery, None);
    assert!(!outcome.artifact_removed);
    assert!(export.exists());
    assert!(session.closed());
    // Only the report mail was attempted; no failure notice follows.
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn failed_login_reports_with_screenshot_and_closes() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(dir.path().to_path_buf());
    config.login.max_attempts = 1;
    config.diagnostics.screenshot_path = dir.path().join("error_debug.png");
    let session = portal_session(&config);
    let ocr = ScriptedOcr::new(&[""]);
    let notifier = RecordingNotifier::new(Delivery::Sent);

    let err = Pipeline::new(&config, &ocr, &notifier, dir.path())
        .run(&session, run_date())
        .await
        .unwrap_err();

    assert!(matches!(err, NightshiftError::LoginFailed { attempts: 1 }));
    assert!(session.closed());
    assert_eq!(session.count("full page screenshot"), 1);
    assert_eq!(session.count("screenshot"), 0);
    assert_eq!(std::fs::read(dir.path().join("error_debug.png")).unwrap(), PNG);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "GPS Automation FAILED");
    assert_eq!(sent[0].body, "Error details: Failed to login after 1 attempts");
    assert_eq!(
        sent[0].attachment.as_deref(),
        Some(dir.path().join("error_debug.png").as_path())
    );
}

#[tokio::test]
async fn missing_download_times_out() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let downloads = dir.path().join("downloads");
    std::fs::create_dir(&downloads).unwrap();
    let mut config = fast_config(downloads.clone());
    config.diagnostics.screenshot_path = dir.path().join("error_debug.png");
    let session = portal_session(&config);
    let ocr = ScriptedOcr::new(&["4817"]);
    let notifier = RecordingNotifier::new(Delivery::Sent);

    let err = Pipeline::new(&config, &ocr, &notifier, &downloads)
        .run(&session, run_date())
        .await
        .unwrap_err();

    assert!(matches!(err, NightshiftError::DownloadTimeout { .. }));
    assert_eq!(
        notifier.sent()[0].body,
        "Error details: Download timeout (1s). No new files found."
    );
}
