use nightshift_common::NightshiftError;
use nightshift_report::DownloadWatcher;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::time::{Duration, Instant, SystemTime};

fn quick_watcher(dir: &std::path::Path, timeout: Duration) -> DownloadWatcher {
    DownloadWatcher::new(dir, timeout)
        .with_poll_interval(Duration::from_millis(50))
        .with_confirm_delay(Duration::from_millis(300))
        .with_stale_grace(Duration::ZERO)
}

#[tokio::test]
async fn stable_file_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xls");
    std::fs::write(&path, b"payload").unwrap();

    let found = quick_watcher(dir.path(), Duration::from_secs(5))
        .wait_for_download()
        .await
        .unwrap();
    assert_eq!(found, path);
}

#[tokio::test]
async fn growing_file_needs_two_matching_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xls");
    std::fs::write(&path, b"first").unwrap();

    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let mut file = OpenOptions::new().append(true).open(&writer_path).unwrap();
        file.write_all(b" and the rest").unwrap();
    });

    let started = Instant::now();
    let found = quick_watcher(dir.path(), Duration::from_secs(5))
        .wait_for_download()
        .await
        .unwrap();
    writer.await.unwrap();

    assert_eq!(found, path);
    // The first confirmation saw the size change, so a second full cycle ran.
    assert!(started.elapsed() >= Duration::from_millis(550));
}

#[tokio::test]
async fn stale_and_partial_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let old = dir.path().join("yesterday.xls");
    std::fs::write(&old, b"old report").unwrap();
    File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();
    std::fs::write(dir.path().join("report.xls.crdownload"), b"partial").unwrap();
    std::fs::write(dir.path().join(".DS_Store"), b"hidden").unwrap();
    std::fs::write(dir.path().join("empty.xls"), b"").unwrap();

    let err = quick_watcher(dir.path(), Duration::from_millis(400))
        .wait_for_download()
        .await
        .unwrap_err();
    assert!(matches!(err, NightshiftError::DownloadTimeout { .. }));
}

#[tokio::test]
async fn newest_file_across_directories_wins() {
    let primary = tempfile::tempdir().unwrap();
    let fallback = tempfile::tempdir().unwrap();
    let older = primary.path().join("a.xls");
    std::fs::write(&older, b"a").unwrap();
    File::options()
        .write(true)
        .open(&older)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(5))
        .unwrap();
    let newer = fallback.path().join("b.xls");
    std::fs::write(&newer, b"b").unwrap();

    let watcher = DownloadWatcher::new(primary.path(), Duration::from_secs(40))
        .with_directory(fallback.path())
        .with_directory(primary.path());
    assert_eq!(watcher.directories().len(), 2);

    let candidate = watcher.newest_candidate().unwrap();
    assert_eq!(candidate.path, newer);
    assert_eq!(candidate.directory_origin, fallback.path());
}

#[tokio::test]
async fn missing_directories_only_time_out() {
    let dir = tempfile::tempdir().unwrap();
    let err = quick_watcher(&dir.path().join("absent"), Duration::from_millis(200))
        .wait_for_download()
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Download timeout (200ms). No new files found.");
}

#[tokio::test]
async fn file_removed_before_confirmation_is_not_returned() {
    let dir = tempfile::tempdir().unwrap();
    let vanishing = dir.path().join("temp_export.xls");
    std::fs::write(&vanishing, b"partial").unwrap();
    let finished = dir.path().join("report.xls");

    let (gone, done) = (vanishing.clone(), finished.clone());
    let browser = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::remove_file(&gone).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        std::fs::write(&done, b"complete report").unwrap();
    });

    let found = quick_watcher(dir.path(), Duration::from_secs(5))
        .wait_for_download()
        .await
        .unwrap();
    browser.await.unwrap();

    assert_eq!(found, finished);
    assert!(!vanishing.exists());
}
