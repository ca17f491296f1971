//! Resolve a logical UI target through an ordered list of selector strategies.
//!
//! The report dashboard has no stable element ids, so every target carries a
//! fallback table. Strategies are pure descriptions; [`UiLocator::resolve`]
//! is the only place that turns them into browser calls.
use crate::browser::session::{BrowserSession, DomQuery, PageElement};
use nightshift_common::{NightshiftError, Result};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// CSS selector, for the rare element with a stable id.
    DirectSelector,
    /// XPath anchored to the DOM shape currently served.
    StructuralPath,
    /// Element of a given tag whose text contains a localized label.
    TextContentMatch,
    /// In-page script that inspects live DOM state and clicks itself; a
    /// truthy return value means it acted.
    ScriptInjectedQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorStrategy {
    pub kind: StrategyKind,
    /// CSS, XPath, tag name or script body depending on `kind`.
    pub pattern: String,
    /// Label for text matches, `arguments[0]` for scripts.
    pub argument: Option<String>,
    /// Per-strategy bound; the locator default applies when `None`.
    pub wait: Option<Duration>,
}

impl SelectorStrategy {
    pub fn direct(css: impl Into<String>) -> Self {
        Self::new(StrategyKind::DirectSelector, css.into(), None)
    }

    pub fn structural(xpath: impl Into<String>) -> Self {
        Self::new(StrategyKind::StructuralPath, xpath.into(), None)
    }

    pub fn text(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(StrategyKind::TextContentMatch, tag.into(), Some(label.into()))
    }

    pub fn script(body: impl Into<String>) -> Self {
        Self::new(StrategyKind::ScriptInjectedQuery, body.into(), None)
    }

    pub fn script_with(body: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::new(
            StrategyKind::ScriptInjectedQuery,
            body.into(),
            Some(argument.into()),
        )
    }

    pub fn waiting(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    fn new(kind: StrategyKind, pattern: String, argument: Option<String>) -> Self {
        Self {
            kind,
            pattern,
            argument,
            wait: None,
        }
    }

    /// The element query this strategy evaluates, if it is query based.
    pub fn dom_query(&self) -> Option<DomQuery> {
        match self.kind {
            StrategyKind::DirectSelector => Some(DomQuery::Css(self.pattern.clone())),
            StrategyKind::StructuralPath => Some(DomQuery::XPath(self.pattern.clone())),
            StrategyKind::TextContentMatch => Some(DomQuery::XPath(text_match_xpath(
                &self.pattern,
                self.argument.as_deref().unwrap_or_default(),
            ))),
            StrategyKind::ScriptInjectedQuery => None,
        }
    }
}

/// A named element with its ordered fallback strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct UiTarget {
    pub name: String,
    pub strategies: Vec<SelectorStrategy>,
}

impl UiTarget {
    pub fn new(name: impl Into<String>, strategies: Vec<SelectorStrategy>) -> Self {
        Self {
            name: name.into(),
            strategies,
        }
    }
}

/// What to do with the element once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementAction {
    Click,
    SendKeys(String),
    /// Capture a PNG of the element.
    Capture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Position of the winning strategy in the target's list.
    pub strategy_index: usize,
    pub kind: StrategyKind,
    /// Set for [`ElementAction::Capture`].
    pub capture: Option<Vec<u8>>,
}

enum Attempt {
    /// The action was performed; carries the capture for `Capture`.
    Acted(Option<Vec<u8>>),
    Unresolved,
}

/// Stateless resolver over [`UiTarget`] strategy lists.
#[derive(Debug, Clone, Copy)]
pub struct UiLocator {
    default_wait: Duration,
}

impl UiLocator {
    pub fn new(default_wait: Duration) -> Self {
        Self { default_wait }
    }

    /// Try each strategy in order and perform `action` on the first element
    /// found. A strategy that errors for any reason counts as unresolved; only
    /// exhausting the list yields [`NightshiftError::ElementNotFound`].
    pub async fn resolve<S: BrowserSession>(
        &self,
        session: &S,
        target: &UiTarget,
        action: &ElementAction,
    ) -> Result<Resolution> {
        for (index, strategy) in target.strategies.iter().enumerate() {
            let wait = strategy.wait.unwrap_or(self.default_wait);
            match self.attempt(session, strategy, wait, action).await {
                Ok(Attempt::Acted(capture)) => {
                    info!(
                        target: "browser.locator",
                        target_name = %target.name,
                        strategy = index,
                        kind = ?strategy.kind,
                        "resolved"
                    );
                    return Ok(Resolution {
                        strategy_index: index,
                        kind: strategy.kind,
                        capture,
                    });
                }
                Ok(Attempt::Unresolved) => {
                    debug!(
                        target: "browser.locator",
                        target_name = %target.name,
                        strategy = index,
                        kind = ?strategy.kind,
                        "strategy matched nothing"
                    );
                }
                Err(err) => {
                    debug!(
                        target: "browser.locator",
                        target_name = %target.name,
                        strategy = index,
                        kind = ?strategy.kind,
                        error = %err,
                        "strategy failed"
                    );
                }
            }
        }

        Err(NightshiftError::ElementNotFound {
            target: target.name.clone(),
        })
    }

    async fn attempt<S: BrowserSession>(
        &self,
        session: &S,
        strategy: &SelectorStrategy,
        wait: Duration,
        action: &ElementAction,
    ) -> Result<Attempt> {
        if strategy.kind == StrategyKind::ScriptInjectedQuery {
            if *action != ElementAction::Click {
                return Ok(Attempt::Unresolved);
            }
            let args = strategy
                .argument
                .iter()
                .map(|arg| Value::String(arg.clone()))
                .collect();
            let outcome = session.execute(&strategy.pattern, args).await?;
            return Ok(if is_truthy(&outcome) {
                Attempt::Acted(None)
            } else {
                Attempt::Unresolved
            });
        }

        let Some(query) = strategy.dom_query() else {
            return Ok(Attempt::Unresolved);
        };
        let element = session.wait_for(&query, wait).await?;
        match action {
            ElementAction::Click => {
                element.click().await?;
                Ok(Attempt::Acted(None))
            }
            ElementAction::SendKeys(text) => {
                element.send_keys(text).await?;
                Ok(Attempt::Acted(None))
            }
            ElementAction::Capture => Ok(Attempt::Acted(Some(element.screenshot().await?))),
        }
    }
}

/// XPath matching a `tag` element whose text content contains `label`.
pub fn text_match_xpath(tag: &str, label: &str) -> String {
    format!("//{tag}[contains(., {})]", xpath_literal(label))
}

/// Quote `value` as an XPath 1.0 string literal.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// JavaScript truthiness for a script's return value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
