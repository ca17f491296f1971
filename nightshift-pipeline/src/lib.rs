//! The nightly report run.
//!
//! [`Pipeline`] sequences the stages against any
//! [`nightshift_drivers::BrowserSession`]:
//!
//! 1. [`auth::AuthenticationStage`] logs in, retrying on unreadable captchas
//! 2. [`navigation::ReportNavigationStage`] filters and exports the DMS report
//! 3. the download is awaited, renamed if needed and summarised
//! 4. the artifact is mailed and then removed
//!
//! Any stage failure is captured, reported to the operator and returned.
pub mod auth;
pub mod navigation;
pub mod orchestrator;
pub mod targets;
pub mod window;

pub use auth::{AuthenticationStage, LoginAttempt, LoginOutcome};
pub use navigation::ReportNavigationStage;
pub use orchestrator::{capture_diagnostics, notify_failure, Pipeline, PipelineOutcome};
pub use window::ReportTimeWindow;
