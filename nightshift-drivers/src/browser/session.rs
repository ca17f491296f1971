use async_trait::async_trait;
use nightshift_common::Result;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A query the browser engine can evaluate against the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomQuery {
    Css(String),
    XPath(String),
}

impl fmt::Display for DomQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomQuery::Css(css) => write!(f, "css:{css}"),
            DomQuery::XPath(xpath) => write!(f, "xpath:{xpath}"),
        }
    }
}

/// Keyboard input sent to whatever element currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Tab,
    Enter,
    Escape,
    Backspace,
    /// Ctrl+A.
    SelectAll,
}

/// Opaque reference to one browser tab/window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageHandle(pub String);

impl fmt::Display for PageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An element resolved on the current page.
#[async_trait]
pub trait PageElement: Send + Sync {
    async fn click(&self) -> Result<()>;

    /// Type text into the element.
    async fn send_keys(&self, text: &str) -> Result<()>;

    /// PNG capture of the element's bounding box.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// Browser surface used by the pipeline stages.
///
/// A session drives one page at a time; [`BrowserSession::switch_to`] moves
/// that focus between tabs. Implementations are not expected to support
/// concurrent mutation.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: PageElement;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Wait up to `wait` for the first element matching `query`.
    ///
    /// Returns [`nightshift_common::NightshiftError::ElementNotFound`] when
    /// nothing matched within the bound.
    async fn wait_for(&self, query: &DomQuery, wait: Duration) -> Result<Self::Element>;

    /// Evaluate a script body in the page; `arguments[i]` maps to `args[i]`.
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    async fn press(&self, keys: &[Keystroke]) -> Result<()>;

    /// Type text into the focused element.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// PNG capture of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// PNG capture of the whole document. Engines that cannot grow the
    /// viewport return the plain [`BrowserSession::screenshot`].
    async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        self.screenshot().await
    }

    /// All open tabs, oldest first.
    async fn page_handles(&self) -> Result<Vec<PageHandle>>;

    async fn switch_to(&self, handle: &PageHandle) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
