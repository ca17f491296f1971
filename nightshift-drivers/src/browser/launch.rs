use nightshift_config::BrowserConfig;
use serde_json::{json, Value};
use std::path::Path;

/// Construct Chrome command-line arguments for an unattended report run.
///
/// The report sub-application is served from a plain-http origin, so mixed
/// content, certificate errors and the download protection prompts are
/// relaxed for that origin.
pub fn build_chrome_arguments(cfg: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--window-size={},{}", cfg.window_width, cfg.window_height),
        "--disable-popup-blocking".to_string(),
        "--allow-running-insecure-content".to_string(),
        "--ignore-certificate-errors".to_string(),
        "--disable-features=IsolateOrigins,site-per-process,SafeBrowsing,DownloadBubble,DownloadBubbleV2".to_string(),
        "--disable-site-isolation-trials".to_string(),
        "--disable-client-side-phishing-detection".to_string(),
        "--safebrowsing-disable-download-protection".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        format!("--lang={}", cfg.locale),
    ];
    if !cfg.insecure_origins.is_empty() {
        args.push(format!(
            "--unsafely-treat-insecure-origin-as-secure={}",
            cfg.insecure_origins.join(",")
        ));
    }
    if cfg.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

/// Chrome profile preferences: silent downloads into `download_dir` and the
/// configured Accept-Language.
pub fn build_chrome_prefs(download_dir: &Path, accept_language: &str) -> Value {
    json!({
        "download.default_directory": download_dir.display().to_string(),
        "download.prompt_for_download": false,
        "download.directory_upgrade": true,
        "safebrowsing.enabled": false,
        "intl.accept_languages": accept_language,
        "profile.default_content_setting_values.automatic_downloads": 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn headless_flags_follow_config() {
        let mut cfg = BrowserConfig::default();
        assert!(build_chrome_arguments(&cfg).contains(&"--headless=new".to_string()));

        cfg.headless = false;
        let args = build_chrome_arguments(&cfg);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--lang=th-TH".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
    }

    #[test]
    fn prefs_point_downloads_at_directory() {
        let prefs = build_chrome_prefs(&PathBuf::from("/srv/dl"), "th-TH,th;q=0.9");
        assert_eq!(prefs["download.default_directory"], "/srv/dl");
        assert_eq!(prefs["download.prompt_for_download"], false);
        assert_eq!(prefs["intl.accept_languages"], "th-TH,th;q=0.9");
    }
}
