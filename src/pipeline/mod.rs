//! The report automation pipeline: a sequential, browser-driven procedure
//! over the vendor dashboard, structured as named stages:
//!
//! launch browser → navigate → login → {performance | test analysis} →
//! cooldown → done | cancelled | failed
//!
//! Cancellation is cooperative: the flag is polled at the named waits and
//! during the cooldown loop. A run blocked inside a stage's own timeout
//! cannot be interrupted mid-stage.

pub mod download;
pub mod locate;
pub mod performance;
pub mod selectors;
pub mod test_analysis;

use std::time::Duration;
use thirtyfour::{Key, WebDriver};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{
    CANCEL_POLL_INTERVAL_SECS, LOCATE_POLL_INTERVAL_MS, LOGIN_FIELD_TIMEOUT_SECS,
    LOGIN_SUBMIT_TIMEOUT_SECS, PAGE_READY_TIMEOUT_SECS, PAGE_SETTLE_MS,
    PASSWORD_FIELD_TIMEOUT_SECS,
};
use crate::error::AgentError;
use crate::request::{ReportKind, ReportRequest};
use crate::runs::CancelToken;
use crate::state::SharedState;
use locate::locate;

/// Terminal result of one automation run.
#[derive(Debug)]
pub enum RunOutcome {
    Done { message: String },
    /// The flow stopped at a stage with no implementation yet. No file was
    /// produced; reported distinctly so the registry/UI layer is not misled.
    NotImplemented { stage: &'static str },
    Cancelled,
}

/// Run one report automation to completion. This is the run boundary: every
/// failure is caught and reduced to a log line, and the run is always
/// removed from the registry when the task ends.
pub async fn run_report(
    state: SharedState,
    run_id: Uuid,
    token: CancelToken,
    request: ReportRequest,
) {
    info!(%run_id, kind = ?request.kind, "automation run starting");
    let started = Instant::now();

    match drive(&state, run_id, &token, &request).await {
        Ok(RunOutcome::Done { message }) => {
            info!(%run_id, elapsed = ?started.elapsed(), "run complete: {message}");
        }
        Ok(RunOutcome::NotImplemented { stage }) => {
            warn!(%run_id, "run stopped: flow not implemented past {stage}; no file produced");
        }
        Ok(RunOutcome::Cancelled) | Err(AgentError::Cancelled) => {
            info!(%run_id, "run cancelled by user");
        }
        Err(e) => {
            error!(%run_id, "run failed: {e}");
        }
    }

    state.runs.remove(run_id).await;
}

async fn drive(
    state: &SharedState,
    run_id: Uuid,
    token: &CancelToken,
    request: &ReportRequest,
) -> Result<RunOutcome, AgentError> {
    let staging = state.config.staging_dir(run_id);
    tokio::fs::create_dir_all(&staging).await?;
    let driver = crate::browser::launch(&state.config, &staging).await?;
    state.runs.attach_browser(run_id, driver.clone()).await;

    let outcome = drive_flow(&driver, state, token, request, &staging).await;

    // The browser is closed deterministically at run end whatever the
    // outcome; a cancel may already have quit it, which is fine.
    if let Err(e) = driver.quit().await {
        debug!(%run_id, "browser close at run end: {e}");
    }
    let _ = tokio::fs::remove_dir_all(&staging).await;

    outcome
}

async fn drive_flow(
    driver: &WebDriver,
    state: &SharedState,
    token: &CancelToken,
    request: &ReportRequest,
    staging: &std::path::Path,
) -> Result<RunOutcome, AgentError> {
    // The readiness wait is non-fatal; vendor pages hold open long-poll
    // connections and may never settle.
    driver.goto(&request.url).await?;
    wait_for_ready(driver, Duration::from_secs(PAGE_READY_TIMEOUT_SECS)).await;
    if token.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    login(driver, request).await?;
    wait_for_ready(driver, Duration::from_secs(PAGE_READY_TIMEOUT_SECS)).await;
    settle().await;
    if token.is_cancelled() {
        return Ok(RunOutcome::Cancelled);
    }

    let flow_result = match request.kind {
        ReportKind::Performance => {
            let message = performance::run(driver, state, token, request, staging).await?;
            RunOutcome::Done { message }
        }
        ReportKind::TestAnalysis => {
            test_analysis::run(driver).await?;
            RunOutcome::NotImplemented {
                stage: "report-type selection",
            }
        }
    };

    // Keep the session alive for operator inspection, polling the
    // cancellation flag.
    if cooldown(token, state.config.cooldown_secs).await {
        return Ok(RunOutcome::Cancelled);
    }

    Ok(flow_result)
}

/// LOGIN stage. Credential fields are required: without them nothing can be
/// submitted, so their absence is fatal. The submit control is unstable and
/// falls back to an Enter keypress in the password field.
async fn login(driver: &WebDriver, request: &ReportRequest) -> Result<(), AgentError> {
    let username = locate(
        driver,
        "username field",
        selectors::LOGIN_USERNAME,
        Duration::from_secs(LOGIN_FIELD_TIMEOUT_SECS),
    )
    .await
    .map_err(|_| AgentError::LoginFieldNotFound("username field".to_string()))?;
    username.send_keys(&request.username).await?;

    let password = locate(
        driver,
        "password field",
        selectors::LOGIN_PASSWORD,
        Duration::from_secs(PASSWORD_FIELD_TIMEOUT_SECS),
    )
    .await
    .map_err(|_| AgentError::LoginFieldNotFound("password field".to_string()))?;
    password.send_keys(&request.password).await?;

    match locate(
        driver,
        "login button",
        selectors::LOGIN_SUBMIT,
        Duration::from_secs(LOGIN_SUBMIT_TIMEOUT_SECS),
    )
    .await
    {
        Ok(button) => button.click().await?,
        Err(_) => {
            debug!("no login button resolved; submitting with Enter");
            password.send_keys(enter_key()).await?;
        }
    }
    Ok(())
}

/// Poll `document.readyState` until the page reports complete. Stands in
/// for a network-idle wait, which WebDriver does not expose. Non-fatal.
pub(crate) async fn wait_for_ready(driver: &WebDriver, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(ret) = driver
            .execute("return document.readyState;", Vec::new())
            .await
        {
            if ret.json().as_str() == Some("complete") {
                return;
            }
        }
        if Instant::now() >= deadline {
            debug!("page did not reach readyState=complete within {timeout:?}");
            return;
        }
        sleep(Duration::from_millis(LOCATE_POLL_INTERVAL_MS)).await;
    }
}

/// Short fixed dwell for the vendor's client-side rendering to catch up
/// after a navigation.
pub(crate) async fn settle() {
    sleep(Duration::from_millis(PAGE_SETTLE_MS)).await;
}

pub(crate) fn enter_key() -> String {
    char::from(Key::Enter).to_string()
}

/// Post-flow keep-open window. Returns true if cancellation was observed;
/// the poll interval bounds how long a cancel can go unnoticed here.
async fn cooldown(token: &CancelToken, total_secs: u64) -> bool {
    let mut waited = 0u64;
    while waited < total_secs {
        if token.is_cancelled() {
            return true;
        }
        let step = CANCEL_POLL_INTERVAL_SECS.min(total_secs - waited);
        sleep(Duration::from_secs(step)).await;
        waited += step;
    }
    token.is_cancelled()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runs::RunRegistry;

    #[tokio::test]
    async fn test_cooldown_returns_immediately_when_zero() {
        let registry = RunRegistry::new();
        let (_, token) = registry.create().await;
        assert!(!cooldown(&token, 0).await);
    }

    #[tokio::test]
    async fn test_cooldown_observes_cancellation() {
        let registry = RunRegistry::new();
        let (id, token) = registry.create().await;
        registry.cancel(id).await;
        // Flag is already set, so the loop exits on its first poll.
        assert!(cooldown(&token, 60).await);
    }

    #[test]
    fn test_enter_key_is_webdriver_enter_codepoint() {
        assert_eq!(enter_key(), "\u{e007}");
    }
}
