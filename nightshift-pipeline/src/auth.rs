//! Login with OCR-read captcha, retried up to a fixed number of attempts.
use crate::targets;
use nightshift_common::{NightshiftError, Result};
use nightshift_config::{Credentials, LoginConfig, PortalConfig};
use nightshift_drivers::{BrowserSession, ElementAction, UiLocator, UiTarget};
use nightshift_ocr::{normalize_captcha, readable_captcha, OcrEngine};
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    /// OCR text was empty or too short; nothing was submitted.
    InvalidCaptcha,
    /// The portal kept us on the login page.
    RejectedByServer,
    /// Anything else went wrong during the attempt.
    TransientError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub attempt_number: u32,
    pub captcha_text: Option<String>,
    pub outcome: LoginOutcome,
}

pub struct AuthenticationStage<'a> {
    portal: &'a PortalConfig,
    login: &'a LoginConfig,
    credentials: Credentials,
    locator: UiLocator,
}

impl<'a> AuthenticationStage<'a> {
    pub fn new(portal: &'a PortalConfig, login: &'a LoginConfig) -> Self {
        Self {
            portal,
            login,
            credentials: portal.credentials(),
            locator: UiLocator::new(login.element_wait()),
        }
    }

    /// Attempt to log in until one attempt succeeds or the budget is spent.
    ///
    /// Returns every attempt made, the last one being the success.
    pub async fn run<S, O>(&self, session: &S, ocr: &O) -> Result<Vec<LoginAttempt>>
    where
        S: BrowserSession,
        O: OcrEngine + ?Sized,
    {
        if !self.credentials.is_complete() {
            warn!(target: "pipeline.auth", "portal username or password is missing");
        }

        let max_attempts = self.login.max_attempts;
        let mut attempts = Vec::new();
        for attempt_number in 1..=max_attempts {
            info!(target: "pipeline.auth", attempt = attempt_number, max_attempts, "login attempt");
            let attempt = match self.attempt(session, ocr, attempt_number).await {
                Ok(attempt) => attempt,
                Err(err) => {
                    warn!(target: "pipeline.auth", attempt = attempt_number, error = %err, "error during login");
                    LoginAttempt {
                        attempt_number,
                        captcha_text: None,
                        outcome: LoginOutcome::TransientError,
                    }
                }
            };
            let outcome = attempt.outcome;
            attempts.push(attempt);

            if outcome == LoginOutcome::Success {
                info!(target: "pipeline.auth", attempt = attempt_number, "login successful");
                sleep(self.login.dashboard_settle()).await;
                return Ok(attempts);
            }
        }

        Err(NightshiftError::LoginFailed {
            attempts: max_attempts,
        })
    }

    async fn attempt<S, O>(&self, session: &S, ocr: &O, attempt_number: u32) -> Result<LoginAttempt>
    where
        S: BrowserSession,
        O: OcrEngine + ?Sized,
    {
        session.goto(&self.portal.login_url).await?;
        sleep(self.login.page_settle()).await;

        let png = self
            .locator
            .resolve(session, &targets::captcha_image(), &ElementAction::Capture)
            .await?
            .capture
            .ok_or_else(|| NightshiftError::ElementNotFound {
                target: "captcha image".into(),
            })?;
        let raw = ocr.recognize(&png, &self.login.captcha_whitelist).await?;

        let code = match readable_captcha(&raw, self.login.captcha_min_len) {
            Ok(code) => code,
            Err(err) => {
                warn!(target: "pipeline.auth", attempt = attempt_number, error = %err, "invalid captcha, retrying");
                return Ok(LoginAttempt {
                    attempt_number,
                    captcha_text: Some(normalize_captcha(&raw)),
                    outcome: LoginOutcome::InvalidCaptcha,
                });
            }
        };
        info!(target: "pipeline.auth", captcha = %code, "read captcha");

        self.fill(session, targets::username_input(), &self.credentials.username)
            .await?;
        self.fill(session, targets::password_input(), &self.credentials.password)
            .await?;
        self.fill(session, targets::captcha_input(), &code).await?;
        self.locator
            .resolve(session, &targets::login_submit(), &ElementAction::Click)
            .await?;
        sleep(self.login.navigation_wait()).await;

        let current = session.current_url().await?;
        let outcome = if is_login_page(&current, &self.portal.login_url) {
            warn!(
                target: "pipeline.auth",
                attempt = attempt_number,
                error = %NightshiftError::LoginRejected,
                "still on login page"
            );
            LoginOutcome::RejectedByServer
        } else {
            LoginOutcome::Success
        };
        Ok(LoginAttempt {
            attempt_number,
            captcha_text: Some(code),
            outcome,
        })
    }

    async fn fill<S: BrowserSession>(&self, session: &S, target: UiTarget, text: &str) -> Result<()> {
        self.locator
            .resolve(session, &target, &ElementAction::SendKeys(text.to_string()))
            .await
            .map(|_| ())
    }
}

/// Whether `current` is still the login page, ignoring query and fragment.
pub fn is_login_page(current: &str, login_url: &str) -> bool {
    match (Url::parse(current), Url::parse(login_url)) {
        (Ok(current), Ok(login)) => {
            current.host_str() == login.host_str() && current.path() == login.path()
        }
        _ => current.contains(login_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = "https://dvrai.net/808gps/login.html";

    #[test]
    fn login_page_detection_ignores_query() {
        assert!(is_login_page(LOGIN, LOGIN));
        assert!(is_login_page("https://dvrai.net/808gps/login.html?lang=th", LOGIN));
        assert!(!is_login_page("https://dvrai.net/808gps/index.html", LOGIN));
        assert!(!is_login_page("about:blank", LOGIN));
    }
}
