//! Report center: open the new tab, apply the DMS filters and export.
//!
//! The report SPA offers no completion events, so most steps are followed by
//! a configured settle duration.
use crate::targets;
use crate::window::ReportTimeWindow;
use nightshift_common::{NightshiftError, Result};
use nightshift_config::{LoginConfig, ReportConfig};
use nightshift_drivers::locator::is_truthy;
use nightshift_drivers::{
    BrowserSession, ElementAction, Keystroke, PageHandle, UiLocator, UiTarget,
};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

const INTERSTITIAL_PAUSE: Duration = Duration::from_secs(1);
const INTERSTITIAL_WAIT: Duration = Duration::from_secs(2);

pub struct ReportNavigationStage<'a> {
    report: &'a ReportConfig,
    window: ReportTimeWindow,
    locator: UiLocator,
}

impl<'a> ReportNavigationStage<'a> {
    pub fn new(report: &'a ReportConfig, login: &LoginConfig, window: ReportTimeWindow) -> Self {
        Self {
            report,
            window,
            locator: UiLocator::new(login.element_wait()),
        }
    }

    /// Drive the report center through to the save click. Returns the
    /// report tab, which stays focused.
    pub async fn run<S: BrowserSession>(&self, session: &S) -> Result<PageHandle> {
        let tab = self.open_report_tab(session).await?;
        session.switch_to(&tab).await?;
        sleep(self.report.tab_settle()).await;
        self.dismiss_interstitial(session).await;

        info!(target: "pipeline.report", "configuring report filters");
        self.step(
            session,
            "select report category",
            &targets::report_category(self.report),
            ElementAction::Click,
        )
        .await?;
        self.select_alert_types(session).await?;

        info!(target: "pipeline.report", window = %self.window, "setting time window");
        let (start, end) = (self.window.start_text(), self.window.end_text());
        self.enter_time(session, "enter start time", targets::start_time_input(), &start)
            .await?;
        self.enter_time(session, "enter end time", targets::end_time_input(), &end)
            .await?;

        self.tab_then_enter(session)
            .await
            .map_err(|e| NightshiftError::in_step("submit filters", e))?;
        info!(
            target: "pipeline.report",
            wait = ?self.report.generation_wait(),
            "waiting for report generation"
        );
        sleep(self.report.generation_wait()).await;

        self.tab_then_enter(session)
            .await
            .map_err(|e| NightshiftError::in_step("export report", e))?;
        info!(
            target: "pipeline.report",
            wait = ?self.report.save_dialog_wait(),
            "waiting for save dialog"
        );
        sleep(self.report.save_dialog_wait()).await;

        self.step(
            session,
            "save export",
            &targets::save_button(self.report),
            ElementAction::Click,
        )
        .await?;
        info!(target: "pipeline.report", "save clicked");
        Ok(tab)
    }

    /// Poll for a tab beyond those open now, nudging the dashboard to open
    /// the report center on every round.
    async fn open_report_tab<S: BrowserSession>(&self, session: &S) -> Result<PageHandle> {
        let initial = session.page_handles().await?.len();
        let deadline = Instant::now() + self.report.tab_wait();
        info!(target: "pipeline.report", open_tabs = initial, "opening report center");

        loop {
            if let Some(tab) = newest_beyond(session.page_handles().await?, initial) {
                info!(target: "pipeline.report", %tab, "new tab detected");
                return Ok(tab);
            }

            match session.execute(targets::OPEN_REPORT_CENTER, Vec::new()).await {
                Ok(result) if is_truthy(&result) => {
                    info!(target: "pipeline.report", triggered = %result, "report center triggered");
                }
                Ok(_) => debug!(target: "pipeline.report", "report center hook not found"),
                Err(err) => {
                    debug!(target: "pipeline.report", error = %err, "report center hook failed")
                }
            }

            if Instant::now() >= deadline {
                break;
            }
            sleep(self.report.tab_poll()).await;
        }

        newest_beyond(session.page_handles().await?, initial).ok_or_else(|| {
            NightshiftError::NavigationTimeout {
                what: "report center tab".into(),
                waited: self.report.tab_wait(),
            }
        })
    }

    /// Click through the browser's insecure-origin warning when it is shown.
    async fn dismiss_interstitial<S: BrowserSession>(&self, session: &S) {
        let title = session.title().await.unwrap_or_default();
        if !(title.contains("Privacy") || title.contains("Security")) {
            return;
        }
        info!(target: "pipeline.report", %title, "dismissing security interstitial");
        let locator = UiLocator::new(INTERSTITIAL_WAIT);
        if locator
            .resolve(session, &targets::interstitial_details(), &ElementAction::Click)
            .await
            .is_err()
        {
            return;
        }
        sleep(INTERSTITIAL_PAUSE).await;
        if let Err(err) = locator
            .resolve(session, &targets::interstitial_proceed(), &ElementAction::Click)
            .await
        {
            debug!(target: "pipeline.report", error = %err, "no proceed link");
        }
    }

    async fn select_alert_types<S: BrowserSession>(&self, session: &S) -> Result<()> {
        sleep(self.report.panel_settle()).await;
        self.step(
            session,
            "open alert type dropdown",
            &targets::alert_type_dropdown(),
            ElementAction::Click,
        )
        .await?;
        sleep(self.report.menu_pause()).await;

        for (i, label) in self.report.alert_labels.iter().enumerate() {
            if i > 0 {
                sleep(self.report.key_pause()).await;
            }
            if let Err(err) = self
                .locator
                .resolve(session, &targets::alert_option(label), &ElementAction::Click)
                .await
            {
                warn!(target: "pipeline.report", %label, error = %err, "alert option not selected");
            }
        }
        session
            .press(&[Keystroke::Escape])
            .await
            .map_err(|e| NightshiftError::in_step("close alert type dropdown", e))
    }

    /// Clear then type: select-all, delete, the full timestamp, confirm.
    async fn enter_time<S: BrowserSession>(
        &self,
        session: &S,
        step: &str,
        target: UiTarget,
        value: &str,
    ) -> Result<()> {
        let typed = async {
            self.locator
                .resolve(session, &target, &ElementAction::Click)
                .await?;
            session.press(&[Keystroke::SelectAll, Keystroke::Backspace]).await?;
            session.type_text(value).await?;
            session.press(&[Keystroke::Enter]).await
        };
        typed.await.map_err(|e| NightshiftError::in_step(step, e))
    }

    async fn tab_then_enter<S: BrowserSession>(&self, session: &S) -> Result<()> {
        sleep(self.report.key_pause()).await;
        session.press(&[Keystroke::Tab]).await?;
        sleep(self.report.key_pause()).await;
        session.press(&[Keystroke::Enter]).await
    }

    async fn step<S: BrowserSession>(
        &self,
        session: &S,
        step: &str,
        target: &UiTarget,
        action: ElementAction,
    ) -> Result<()> {
        self.locator
            .resolve(session, target, &action)
            .await
            .map(|_| ())
            .map_err(|e| NightshiftError::in_step(step, e))
    }
}

fn newest_beyond(handles: Vec<PageHandle>, initial: usize) -> Option<PageHandle> {
    if handles.len() > initial {
        handles.into_iter().last()
    } else {
        None
    }
}
