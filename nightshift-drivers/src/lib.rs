//! Driver layer for the browser-engine collaborator and UI element resolution.
//!
//! - [`browser::session::BrowserSession`]: the narrow browser surface the pipeline needs
//! - [`browser::driver::NightshiftDriver`]: WebDriver (`fantoccini`) implementation
//! - [`browser::launch`]: Chrome launch arguments and download preferences
//! - [`browser::behavioral::BehavioralEngine`]: keystroke pacing
//! - [`locator::UiLocator`]: ordered-strategy element resolution
pub mod browser;
pub mod locator;

pub use browser::session::{BrowserSession, DomQuery, Keystroke, PageElement, PageHandle};
pub use locator::{ElementAction, Resolution, SelectorStrategy, StrategyKind, UiLocator, UiTarget};
