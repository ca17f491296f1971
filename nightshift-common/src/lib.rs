//! Common types and utilities shared across Nightshift crates.
//!
//! This crate defines the error taxonomy and observability helpers used
//! throughout the Nightshift workspace. It is intentionally lightweight so
//! that every crate can depend on it without pulling in the browser, OCR or
//! spreadsheet stacks.
//!
//! # Overview
//!
//! - [`NightshiftError`] and [`Result`]: Shared error handling
//! - [`observability`]: Centralised tracing/logging initialisation
//!
//! # Examples
//!
//! Classifying a failure:
//!
//! ```rust
//! use nightshift_common::NightshiftError;
//!
//! let err = NightshiftError::ElementNotFound { target: "save button".into() };
//! assert!(err.is_element_not_found());
//! assert!(!NightshiftError::LoginRejected.is_element_not_found());
//! ```
use std::time::Duration;

pub mod observability;

/// Error types used across the Nightshift pipeline.
///
/// Local, expected failures (`CaptchaUnreadable`, `LoginRejected`, a single
/// unresolved selector) are absorbed by the stage that raised them. The
/// remaining variants propagate to the orchestrator.
#[derive(thiserror::Error, Debug)]
pub enum NightshiftError {
    /// The OCR result was empty or shorter than the expected captcha length.
    #[error("Captcha unreadable: {0:?}")]
    CaptchaUnreadable(String),

    /// The portal kept us on the login page after submission.
    #[error("Login rejected by server")]
    LoginRejected,

    /// Every login attempt was used up.
    #[error("Failed to login after {attempts} attempts")]
    LoginFailed { attempts: u32 },

    /// No selector strategy resolved the target within its wait bound.
    #[error("Element not found: {target}")]
    ElementNotFound { target: String },

    /// A navigation step did not complete within its bound.
    #[error("Navigation timeout after {waited:?}: {what}")]
    NavigationTimeout { what: String, waited: Duration },

    /// No stable file appeared in the watched download directories.
    #[error("Download timeout ({waited:?}). No new files found.")]
    DownloadTimeout { waited: Duration },

    /// The summary workbook could not be produced.
    #[error("Aggregation error: {0}")]
    Aggregation(String),

    /// A notification could not be delivered.
    #[error("Notification delivery error: {0}")]
    NotificationDelivery(String),

    /// A required report-navigation step failed.
    #[error("Report step '{step}' failed: {source}")]
    ReportStep {
        step: String,
        #[source]
        source: Box<NightshiftError>,
    },

    /// The browser engine reported an error.
    #[error("Driver error: {0}")]
    Driver(String),

    /// The OCR engine could not be run.
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NightshiftError {
    /// Wrap an error raised while executing a named report step.
    pub fn in_step(step: impl Into<String>, source: NightshiftError) -> Self {
        Self::ReportStep {
            step: step.into(),
            source: Box::new(source),
        }
    }

    pub fn driver(err: impl std::fmt::Display) -> Self {
        Self::Driver(err.to_string())
    }

    pub fn is_element_not_found(&self) -> bool {
        match self {
            Self::ElementNotFound { .. } => true,
            Self::ReportStep { source, .. } => source.is_element_not_found(),
            _ => false,
        }
    }
}

/// Convenient alias for results that use [`NightshiftError`].
pub type Result<T> = std::result::Result<T, NightshiftError>;
