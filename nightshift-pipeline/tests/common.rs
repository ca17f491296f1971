#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use nightshift_common::observability::{LogConfig, LogFormat};
use nightshift_common::{NightshiftError, Result};
use nightshift_config::{DownloadConfig, LoginConfig, NightshiftConfig, ReportConfig};
use nightshift_drivers::{BrowserSession, DomQuery, Keystroke, PageElement, PageHandle, UiTarget};
use nightshift_notify::{Delivery, Notification, Notifier};
use nightshift_ocr::OcrEngine;
use nightshift_pipeline::targets;
use serde_json::Value;

static INIT_PATH: OnceLock<PathBuf> = OnceLock::new();

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

pub const LOGIN_URL: &str = "https://dvrai.net/808gps/login.html";
pub const DASHBOARD_URL: &str = "https://dvrai.net/808gps/index.html";
pub const PNG: [u8; 4] = [0x89, b'P', b'N', b'G'];

/// Configuration with every settle duration collapsed to zero.
pub fn fast_config(download_dir: PathBuf) -> NightshiftConfig {
    let mut config = NightshiftConfig::default();
    config.portal.username = "fleet".into();
    config.portal.password = "secret".into();
    config.login = LoginConfig {
        max_attempts: 5,
        page_settle_ms: 0,
        navigation_wait_ms: 0,
        dashboard_settle_secs: 0,
        element_wait_secs: 0,
        ..LoginConfig::default()
    };
    config.report = ReportConfig {
        tab_wait_secs: 0,
        tab_poll_secs: 0,
        tab_settle_secs: 0,
        strategy_wait_secs: 0,
        panel_settle_ms: 0,
        menu_pause_ms: 0,
        key_pause_ms: 0,
        generation_wait_secs: 0,
        save_dialog_wait_secs: 0,
        save_wait_secs: 0,
        ..ReportConfig::default()
    };
    config.downloads = DownloadConfig {
        directory: download_dir,
        timeout_secs: 1,
        poll_interval_ms: 10,
        confirm_delay_ms: 0,
        watch_user_downloads: false,
        ..DownloadConfig::default()
    };
    config
}

/// First query of a single-strategy target.
pub fn query(target: UiTarget) -> DomQuery {
    target.strategies[0].dom_query().unwrap()
}

pub fn login_page() -> Vec<DomQuery> {
    vec![
        query(targets::captcha_image()),
        query(targets::username_input()),
        query(targets::password_input()),
        query(targets::captcha_input()),
        query(targets::login_submit()),
    ]
}

/// Report center with the category reachable only through its text label.
pub fn report_center(cfg: &ReportConfig) -> Vec<DomQuery> {
    let mut present = vec![
        targets::report_category(cfg).strategies[2].dom_query().unwrap(),
        query(targets::alert_type_dropdown()),
        query(targets::start_time_input()),
        query(targets::end_time_input()),
        targets::save_button(cfg).strategies[1].dom_query().unwrap(),
    ];
    present.extend(cfg.alert_labels.iter().map(|l| query(targets::alert_option(l))));
    present
}

#[derive(Default)]
pub struct FakeState {
    pub present: Mutex<Vec<DomQuery>>,
    pub url: Mutex<String>,
    /// URL the portal moves to after the login button is clicked.
    pub url_after_submit: Mutex<String>,
    pub handles: Mutex<Vec<String>>,
    /// Whether the dashboard hook opens a report tab.
    pub opens_report_tab: Mutex<bool>,
    pub title: Mutex<String>,
    pub events: Mutex<Vec<String>>,
    pub closed: Mutex<bool>,
}

impl FakeState {
    fn log(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

/// In-memory portal driven by the queries it is told are present.
#[derive(Clone)]
pub struct FakeSession {
    pub state: Arc<FakeState>,
}

impl FakeSession {
    pub fn new(present: Vec<DomQuery>) -> Self {
        let state = FakeState::default();
        *state.present.lock().unwrap() = present;
        *state.url.lock().unwrap() = "about:blank".into();
        *state.url_after_submit.lock().unwrap() = DASHBOARD_URL.into();
        *state.handles.lock().unwrap() = vec!["main".into()];
        *state.opens_report_tab.lock().unwrap() = true;
        Self {
            state: Arc::new(state),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn closed(&self) -> bool {
        *self.state.closed.lock().unwrap()
    }
}

pub struct FakeElement {
    query: DomQuery,
    state: Arc<FakeState>,
}

#[async_trait]
impl PageElement for FakeElement {
    async fn click(&self) -> Result<()> {
        self.state.log(format!("click {}", self.query));
        if self.query == query(targets::login_submit()) {
            let next = self.state.url_after_submit.lock().unwrap().clone();
            *self.state.url.lock().unwrap() = next;
        }
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.state.log(format!("keys {} {text}", self.query));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.state.log(format!("capture {}", self.query));
        Ok(PNG.to_vec())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Element = FakeElement;

    async fn goto(&self, url: &str) -> Result<()> {
        self.state.log(format!("goto {url}"));
        *self.state.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.url.lock().unwrap().clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state.title.lock().unwrap().clone())
    }

    async fn wait_for(&self, query: &DomQuery, _wait: Duration) -> Result<FakeElement> {
        if self.state.present.lock().unwrap().contains(query) {
            Ok(FakeElement {
                query: query.clone(),
                state: Arc::clone(&self.state),
            })
        } else {
            Err(NightshiftError::ElementNotFound {
                target: query.to_string(),
            })
        }
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        if script == targets::OPEN_REPORT_CENTER {
            self.state.log("script open report center");
            if *self.state.opens_report_tab.lock().unwrap() {
                self.state.handles.lock().unwrap().push("report".into());
                return Ok(Value::String("Executed showReportCenter() directly".into()));
            }
            return Ok(Value::Null);
        }
        self.state.log(format!("script {}", Value::Array(args)));
        Ok(Value::Bool(false))
    }

    async fn press(&self, keys: &[Keystroke]) -> Result<()> {
        self.state.log(format!("press {keys:?}"));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        self.state.log(format!("type {text}"));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.state.log("screenshot");
        Ok(PNG.to_vec())
    }

    async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        self.state.log("full page screenshot");
        Ok(PNG.to_vec())
    }

    async fn page_handles(&self) -> Result<Vec<PageHandle>> {
        Ok(self
            .state
            .handles
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(PageHandle)
            .collect())
    }

    async fn switch_to(&self, handle: &PageHandle) -> Result<()> {
        self.state.log(format!("switch {handle}"));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.state.closed.lock().unwrap() = true;
        Ok(())
    }
}

/// OCR that replays canned reads, then returns nothing.
#[derive(Default)]
pub struct ScriptedOcr {
    reads: Mutex<VecDeque<String>>,
    pub calls: Mutex<usize>,
}

impl ScriptedOcr {
    pub fn new(reads: &[&str]) -> Self {
        Self {
            reads: Mutex::new(reads.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, _png: &[u8], whitelist: &str) -> Result<String> {
        assert_eq!(whitelist, "0123456789");
        *self.calls.lock().unwrap() += 1;
        Ok(self.reads.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Records every notification and reports it as `delivery`, or as a relay
/// error when built with [`RecordingNotifier::failing`].
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    delivery: Delivery,
    fails: bool,
}

impl RecordingNotifier {
    pub fn new(delivery: Delivery) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delivery,
            fails: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::new(Delivery::Sent)
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<Delivery> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fails {
            return Err(NightshiftError::NotificationDelivery(
                "554 relay access denied".into(),
            ));
        }
        Ok(self.delivery)
    }
}
