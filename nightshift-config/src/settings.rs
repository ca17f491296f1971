//! Strongly typed settings for one nightly report run.
//!
//! Every field has a default so that a run can be driven purely from
//! environment variables. Secrets default to empty here; the loader fills
//! them from `GPS_USER`, `GPS_PASSWORD` and the `EMAIL_*` variables.
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NightshiftConfig {
    pub portal: PortalConfig,
    pub browser: BrowserConfig,
    pub login: LoginConfig,
    pub report: ReportConfig,
    pub downloads: DownloadConfig,
    pub summary: SummaryConfig,
    pub notify: NotifyConfig,
    pub ocr: OcrConfig,
    pub diagnostics: DiagnosticsConfig,
}

/// Returns the value unchanged unless it is blank.
pub fn supplied(value: &str) -> Option<&str> {
    (!value.trim().is_empty()).then_some(value)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub login_url: String,
    pub username: String,
    pub password: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: "https://dvrai.net/808gps/login.html".into(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl PortalConfig {
    /// The login pair. Passwords are used exactly as given.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: supplied(&self.username).map(str::trim).unwrap_or_default().to_string(),
            password: supplied(&self.password).unwrap_or_default().to_string(),
        }
    }
}

/// Portal login. Immutable once built; `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (Chromedriver by default).
    pub webdriver_url: String,
    pub headless: bool,
    /// Value for Chrome's `--lang`.
    pub locale: String,
    /// Accept-Language preference sent by the browser.
    pub accept_language: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Upper bound for page loads and script execution.
    pub wait_ceiling_secs: u64,
    /// Plain-http origins allowed to serve mixed content and downloads.
    pub insecure_origins: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            locale: "th-TH".into(),
            accept_language: "th-TH,th;q=0.9,en;q=0.8".into(),
            window_width: 1920,
            window_height: 1080,
            wait_ceiling_secs: 60,
            insecure_origins: vec!["http://cctvwli.com:3001".into()],
        }
    }
}

impl BrowserConfig {
    pub fn wait_ceiling(&self) -> Duration {
        Duration::from_secs(self.wait_ceiling_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    pub max_attempts: u32,
    /// Shorter OCR reads are rejected without submitting the form.
    pub captcha_min_len: usize,
    pub captcha_whitelist: String,
    /// Pause after the login page loads, before the captcha is captured.
    pub page_settle_ms: u64,
    /// Pause after submitting, before the URL is checked.
    pub navigation_wait_ms: u64,
    /// Pause after a successful login while the dashboard initialises.
    pub dashboard_settle_secs: u64,
    /// Bound on locating each login form element.
    pub element_wait_secs: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            captcha_min_len: 4,
            captcha_whitelist: "0123456789".into(),
            page_settle_ms: 2_000,
            navigation_wait_ms: 5_000,
            dashboard_settle_secs: 10,
            element_wait_secs: 10,
        }
    }
}

impl LoginConfig {
    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn navigation_wait(&self) -> Duration {
        Duration::from_millis(self.navigation_wait_ms)
    }

    pub fn dashboard_settle(&self) -> Duration {
        Duration::from_secs(self.dashboard_settle_secs)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }
}

/// Timings and localized labels for the report sub-application.
///
/// The waits are settle intervals: the target site emits no completion
/// event for tab creation, report generation or the save dialog.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub tab_wait_secs: u64,
    pub tab_poll_secs: u64,
    pub tab_settle_secs: u64,
    pub strategy_wait_secs: u64,
    pub panel_settle_ms: u64,
    pub menu_pause_ms: u64,
    pub key_pause_ms: u64,
    pub generation_wait_secs: u64,
    pub save_dialog_wait_secs: u64,
    pub save_wait_secs: u64,
    pub category_label: String,
    pub alert_labels: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tab_wait_secs: 60,
            tab_poll_secs: 5,
            tab_settle_secs: 3,
            strategy_wait_secs: 5,
            panel_settle_ms: 2_000,
            menu_pause_ms: 1_000,
            key_pause_ms: 500,
            generation_wait_secs: 120,
            save_dialog_wait_secs: 20,
            save_wait_secs: 60,
            category_label: "รายงาน DMS".into(),
            alert_labels: vec![
                "แจ้งเตือนการหาวนอน".into(),
                "แจ้งเตือนการหลับตา".into(),
            ],
        }
    }
}

impl ReportConfig {
    pub fn tab_wait(&self) -> Duration {
        Duration::from_secs(self.tab_wait_secs)
    }

    pub fn tab_poll(&self) -> Duration {
        Duration::from_secs(self.tab_poll_secs)
    }

    pub fn tab_settle(&self) -> Duration {
        Duration::from_secs(self.tab_settle_secs)
    }

    pub fn strategy_wait(&self) -> Duration {
        Duration::from_secs(self.strategy_wait_secs)
    }

    pub fn panel_settle(&self) -> Duration {
        Duration::from_millis(self.panel_settle_ms)
    }

    pub fn menu_pause(&self) -> Duration {
        Duration::from_millis(self.menu_pause_ms)
    }

    pub fn key_pause(&self) -> Duration {
        Duration::from_millis(self.key_pause_ms)
    }

    pub fn generation_wait(&self) -> Duration {
        Duration::from_secs(self.generation_wait_secs)
    }

    pub fn save_dialog_wait(&self) -> Duration {
        Duration::from_secs(self.save_dialog_wait_secs)
    }

    pub fn save_wait(&self) -> Duration {
        Duration::from_secs(self.save_wait_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Primary download directory, created on first run.
    pub directory: PathBuf,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Delay between the two size observations of a candidate.
    pub confirm_delay_ms: u64,
    /// Files older than `timeout + grace` are treated as stale.
    pub stale_grace_secs: u64,
    /// Also watch the platform's default download directory.
    pub watch_user_downloads: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("downloads"),
            timeout_secs: 40,
            poll_interval_ms: 2_000,
            confirm_delay_ms: 3_000,
            stale_grace_secs: 60,
            watch_user_downloads: true,
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    pub fn stale_grace(&self) -> Duration {
        Duration::from_secs(self.stale_grace_secs)
    }

    /// The user's default download directory, when enabled and present.
    pub fn fallback_directory(&self) -> Option<PathBuf> {
        if !self.watch_user_downloads {
            return None;
        }
        dirs::download_dir().filter(|dir| dir.is_dir())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub sheet_name: String,
    pub plate_label: String,
    pub total_label: String,
    /// Header substrings identifying the license plate column.
    pub plate_header_keys: Vec<String>,
    /// Header substrings identifying the alert type column.
    pub type_header_keys: Vec<String>,
    /// Stem used when a download arrives without a spreadsheet extension.
    pub renamed_stem: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Summary_Pivot".into(),
            plate_label: "ทะเบียนรถ".into(),
            total_label: "รวมทั้งหมด".into(),
            plate_header_keys: vec!["ทะเบียน".into(), "License".into(), "ชื่อรถ".into()],
            type_header_keys: vec![
                "ชนิด".into(),
                "Type".into(),
                "Alarm".into(),
                "Event".into(),
            ],
            renamed_stem: "GPS_Report".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub smtp_host: String,
    pub from: String,
    pub password: String,
    /// Comma separated recipient list.
    pub to: String,
    pub sender_name: String,
    pub success_subject: String,
    pub success_body: String,
    pub failure_subject: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".into(),
            from: String::new(),
            password: String::new(),
            to: String::new(),
            sender_name: "Thai Tracking DMS Reporter".into(),
            success_subject: "THAI TRACKING DMS REPORT".into(),
            success_body: "ถึง ผู้เกี่ยวข้อง\nรายงาน THAI TRACKING DMS REPORT รอบ 18:00 ถึง 06:00 น.\nด้วยความนับถือ\nBOT REPORT".into(),
            failure_subject: "GPS Automation FAILED".into(),
        }
    }
}

impl NotifyConfig {
    /// Sender address and password, if both were supplied.
    pub fn mail_credentials(&self) -> Option<(String, String)> {
        let from = supplied(&self.from)?.trim();
        let password = supplied(&self.password)?;
        Some((from.to_string(), password.to_string()))
    }

    pub fn recipients(&self) -> Vec<String> {
        supplied(&self.to)
            .map(|to| {
                to.split(',')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// `tesseract` executable name or path.
    pub binary: String,
    pub language: String,
    /// Tesseract page segmentation mode; 7 treats the image as one text line.
    pub page_seg_mode: u8,
    /// Integer upscale applied to the captcha before recognition.
    pub upscale: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".into(),
            language: "eng".into(),
            page_seg_mode: 7,
            upscale: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub screenshot_path: PathBuf,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            screenshot_path: PathBuf::from("error_debug.png"),
        }
    }
}
