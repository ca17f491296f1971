use crate::browser::{
    behavioral::BehavioralEngine,
    launch::{build_chrome_arguments, build_chrome_prefs},
    session::{BrowserSession, DomQuery, Keystroke, PageElement, PageHandle},
};
use async_trait::async_trait;
use fantoccini::actions::{InputSource, KeyAction, KeyActions};
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder, Locator};
use nightshift_common::{NightshiftError, Result};
use nightshift_config::BrowserConfig;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use webdriver::capabilities::Capabilities;

/// Thin wrapper around a `fantoccini` WebDriver client.
pub struct NightshiftDriver {
    client: Client,
    behavioral_engine: BehavioralEngine,
}

impl NightshiftDriver {
    /// Start a browser session through a running WebDriver service.
    ///
    /// Downloads land in `download_dir` (must be absolute), and page loads
    /// and scripts are bounded by `cfg.wait_ceiling_secs`. Element lookups use
    /// explicit waits, so the implicit wait is zero.
    pub async fn launch(cfg: &BrowserConfig, download_dir: &Path) -> Result<Self> {
        let mut caps = Capabilities::new();
        let chrome_opts = json!({
            "args": build_chrome_arguments(cfg),
            "prefs": build_chrome_prefs(download_dir, &cfg.accept_language),
        });
        caps.insert("goog:chromeOptions".to_string(), chrome_opts);
        caps.insert("acceptInsecureCerts".to_string(), json!(true));

        info!(
            target: "browser.driver",
            webdriver = %cfg.webdriver_url,
            headless = cfg.headless,
            download_dir = %download_dir.display(),
            "connecting to WebDriver"
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&cfg.webdriver_url)
            .await
            .map_err(NightshiftError::driver)?;

        let ceiling = cfg.wait_ceiling();
        client
            .update_timeouts(TimeoutConfiguration::new(
                Some(ceiling),
                Some(ceiling),
                Some(Duration::ZERO),
            ))
            .await
            .map_err(NightshiftError::driver)?;

        Ok(Self {
            client,
            behavioral_engine: BehavioralEngine::default(),
        })
    }

    fn key_actions(&self, keys: &[Keystroke]) -> KeyActions {
        let mut actions = KeyActions::new("keyboard".to_string());
        for key in keys {
            actions = match key_char(*key) {
                Some(value) => actions
                    .then(KeyAction::Down { value })
                    .then(KeyAction::Up { value }),
                None => actions
                    .then(KeyAction::Down {
                        value: Key::Control.into(),
                    })
                    .then(KeyAction::Down { value: 'a' })
                    .then(KeyAction::Up { value: 'a' })
                    .then(KeyAction::Up {
                        value: Key::Control.into(),
                    }),
            };
        }
        actions
    }
}

/// Single-key strokes; chords (select-all) return `None`.
fn key_char(key: Keystroke) -> Option<char> {
    match key {
        Keystroke::Tab => Some(Key::Tab.into()),
        Keystroke::Enter => Some(Key::Enter.into()),
        Keystroke::Escape => Some(Key::Escape.into()),
        Keystroke::Backspace => Some(Key::Backspace.into()),
        Keystroke::SelectAll => None,
    }
}

/// Document and viewport extent, in CSS pixels.
const DOCUMENT_EXTENT: &str = "const d = document.documentElement; const b = document.body || d; \
return [Math.max(d.scrollWidth, b.scrollWidth), Math.max(d.scrollHeight, b.scrollHeight), \
window.innerWidth, window.innerHeight];";

/// Largest window edge requested for a full-page capture.
const MAX_CAPTURE_EDGE: u64 = 16_384;

/// Window size that brings the whole document into view, or `None` when it
/// already fits. `extent` is `[scrollWidth, scrollHeight, innerWidth, innerHeight]`.
fn full_page_window(window: (u64, u64), extent: &Value) -> Option<(u32, u32)> {
    let dims: Vec<u64> = extent.as_array()?.iter().filter_map(Value::as_u64).collect();
    let &[scroll_w, scroll_h, inner_w, inner_h] = dims.as_slice() else {
        return None;
    };
    if scroll_w <= inner_w && scroll_h <= inner_h {
        return None;
    }
    let grow = |outer: u64, scroll: u64, inner: u64| {
        (outer + scroll.saturating_sub(inner)).min(MAX_CAPTURE_EDGE) as u32
    };
    Some((
        grow(window.0, scroll_w, inner_w),
        grow(window.1, scroll_h, inner_h),
    ))
}

fn is_missing(err: &CmdError) -> bool {
    err.is_no_such_element() || matches!(err, CmdError::WaitTimeout)
}

#[async_trait]
impl BrowserSession for NightshiftDriver {
    type Element = NightshiftElement;

    async fn goto(&self, url: &str) -> Result<()> {
        debug!(target: "browser.driver", %url, "navigating");
        self.client.goto(url).await.map_err(NightshiftError::driver)
    }

    async fn current_url(&self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(NightshiftError::driver)
    }

    async fn title(&self) -> Result<String> {
        self.client.title().await.map_err(NightshiftError::driver)
    }

    async fn wait_for(&self, query: &DomQuery, wait: Duration) -> Result<NightshiftElement> {
        let locator = match query {
            DomQuery::Css(css) => Locator::Css(css),
            DomQuery::XPath(xpath) => Locator::XPath(xpath),
        };
        match self.client.wait().at_most(wait).for_element(locator).await {
            Ok(element) => Ok(NightshiftElement { element }),
            Err(err) if is_missing(&err) => Err(NightshiftError::ElementNotFound {
                target: query.to_string(),
            }),
            Err(err) => Err(NightshiftError::driver(err)),
        }
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client
            .execute(script, args)
            .await
            .map_err(NightshiftError::driver)
    }

    async fn press(&self, keys: &[Keystroke]) -> Result<()> {
        self.client
            .perform_actions(self.key_actions(keys))
            .await
            .map_err(NightshiftError::driver)?;
        self.client
            .release_actions()
            .await
            .map_err(NightshiftError::driver)
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let mut actions = KeyActions::new("keyboard".to_string());
        for ch in text.chars() {
            actions = actions
                .then(KeyAction::Down { value: ch })
                .then(KeyAction::Up { value: ch })
                .then(KeyAction::Pause {
                    duration: self.behavioral_engine.keystroke_pause(),
                });
        }
        self.client
            .perform_actions(actions)
            .await
            .map_err(NightshiftError::driver)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.client
            .screenshot()
            .await
            .map_err(NightshiftError::driver)
    }

    async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        let window = self
            .client
            .get_window_size()
            .await
            .map_err(NightshiftError::driver)?;
        let extent = self.execute(DOCUMENT_EXTENT, Vec::new()).await?;
        let Some((width, height)) = full_page_window(window, &extent) else {
            return self.screenshot().await;
        };

        debug!(target: "browser.driver", width, height, "growing window for full-page capture");
        self.client
            .set_window_size(width, height)
            .await
            .map_err(NightshiftError::driver)?;
        let capture = self.screenshot().await;
        if let Err(err) = self
            .client
            .set_window_size(window.0 as u32, window.1 as u32)
            .await
        {
            debug!(target: "browser.driver", error = %err, "could not restore window size");
        }
        capture
    }

    async fn page_handles(&self) -> Result<Vec<PageHandle>> {
        let windows = self
            .client
            .windows()
            .await
            .map_err(NightshiftError::driver)?;
        Ok(windows
            .into_iter()
            .map(|handle| PageHandle(String::from(handle)))
            .collect())
    }

    async fn switch_to(&self, handle: &PageHandle) -> Result<()> {
        let window = WindowHandle::try_from(handle.0.clone()).map_err(NightshiftError::driver)?;
        self.client
            .switch_to_window(window)
            .await
            .map_err(NightshiftError::driver)
    }

    async fn close(&self) -> Result<()> {
        self.client
            .clone()
            .close()
            .await
            .map_err(NightshiftError::driver)
    }
}

/// Wrapper for DOM elements resolved by [`NightshiftDriver`].
#[derive(Clone)]
pub struct NightshiftElement {
    element: Element,
}

#[async_trait]
impl PageElement for NightshiftElement {
    async fn click(&self) -> Result<()> {
        self.element.click().await.map_err(NightshiftError::driver)
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.element
            .send_keys(text)
            .await
            .map_err(NightshiftError::driver)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.element
            .screenshot()
            .await
            .map_err(NightshiftError::driver)
    }
}
