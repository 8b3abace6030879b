//! Performance-and-participation report flow: navigate the course tree as
//! far as the inputs allow, then drive the export dialog and capture the
//! download. Navigation steps are best-effort; the export steps are not.

use std::path::Path;
use std::time::Duration;
use thirtyfour::{By, WebDriver};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{
    CARD_TIMEOUT_SECS, DIALOG_DISMISS_DELAY_SECS, DOWNLOAD_WAIT_TIMEOUT_SECS,
    EXPORT_MENU_TIMEOUT_SECS, EXPORT_STEP_TIMEOUT_SECS, MENU_TIMEOUT_SECS,
    MODULE_RENDER_DWELL_SECS, NAV_STEP_TIMEOUT_SECS, SEARCH_BOX_TIMEOUT_SECS,
};
use crate::error::AgentError;
use crate::request::ReportRequest;
use crate::runs::CancelToken;
use crate::state::SharedState;

use super::locate::{click_optional, locate, locate_text, try_locate};
use super::{download, enter_key, selectors, settle, wait_for_ready};

pub async fn run(
    driver: &WebDriver,
    state: &SharedState,
    token: &CancelToken,
    request: &ReportRequest,
    staging: &Path,
) -> Result<String, AgentError> {
    navigate(driver, request).await;
    if token.is_cancelled() {
        return Err(AgentError::Cancelled);
    }
    generate(driver, state, request, staging).await
}

/// Walk tool → course → module → test. Every step here is optional: a
/// failed lookup is skipped and the flow still attempts generation from
/// wherever it landed.
async fn navigate(driver: &WebDriver, request: &ReportRequest) {
    click_optional(
        driver,
        "Courses tool",
        selectors::COURSES_TOOL,
        Duration::from_secs(MENU_TIMEOUT_SECS),
    )
    .await;

    let course = request.course.trim();
    if !course.is_empty() {
        open_course(driver, course).await;
    }

    let module = request.module.trim();
    if !module.is_empty() {
        match locate_text(
            driver,
            "module entry",
            selectors::MODULE_ENTRIES,
            module,
            Duration::from_secs(CARD_TIMEOUT_SECS),
        )
        .await
        {
            Ok(entry) => {
                if entry.click().await.is_ok() {
                    sleep(Duration::from_secs(MODULE_RENDER_DWELL_SECS)).await;
                }
            }
            Err(_) => debug!("module entry '{module}': not found, skipping"),
        }
    }

    let test = request.test.trim();
    if !test.is_empty() {
        open_test_card(driver, test).await;
    }
}

async fn open_course(driver: &WebDriver, course: &str) {
    let search = match try_locate(
        driver,
        "course search box",
        selectors::COURSE_SEARCH,
        Duration::from_secs(SEARCH_BOX_TIMEOUT_SECS),
    )
    .await
    {
        Some(el) => el,
        None => return,
    };

    let typed = async {
        search.click().await?;
        search.send_keys(course).await?;
        search.send_keys(enter_key()).await
    }
    .await;
    if let Err(e) = typed {
        debug!("course search: typing failed, skipping: {e}");
        return;
    }

    // Prefer the row matching the query text; otherwise take the first
    // result row the table offers.
    let clicked = match locate_text(
        driver,
        "course row",
        selectors::COURSE_RESULT_ROWS,
        course,
        Duration::from_secs(NAV_STEP_TIMEOUT_SECS),
    )
    .await
    {
        Ok(row) => row.click().await.is_ok(),
        Err(_) => {
            click_optional(
                driver,
                "first course row",
                selectors::COURSE_ROW_FALLBACKS,
                Duration::from_secs(CARD_TIMEOUT_SECS),
            )
            .await
        }
    };
    if clicked {
        wait_for_ready(driver, Duration::from_secs(NAV_STEP_TIMEOUT_SECS)).await;
        settle().await;
    }
}

async fn open_test_card(driver: &WebDriver, test: &str) {
    let card = match locate_text(
        driver,
        "test card",
        selectors::TEST_CARDS,
        test,
        Duration::from_secs(CARD_TIMEOUT_SECS),
    )
    .await
    {
        Ok(card) => card,
        Err(_) => {
            debug!("test card '{test}': not found, skipping");
            return;
        }
    };
    let _ = card.scroll_into_view().await;
    match card.find(By::Css(selectors::TEST_COMPLETED_COUNTER)).await {
        Ok(counter) => {
            if counter.click().await.is_ok() {
                wait_for_ready(driver, Duration::from_secs(2)).await;
            }
        }
        Err(e) => debug!("completion counter: not found, skipping: {e}"),
    }
}

/// The export sequence. These steps are required: a failure here means no
/// report, surfaced as `DownloadFailed` with the failing step named.
async fn generate(
    driver: &WebDriver,
    state: &SharedState,
    request: &ReportRequest,
    staging: &Path,
) -> Result<String, AgentError> {
    hard_click(
        driver,
        "results checkbox",
        selectors::RESULTS_CHECKBOX,
        Duration::from_secs(EXPORT_MENU_TIMEOUT_SECS),
    )
    .await?;
    click_optional(
        driver,
        "select-all link",
        selectors::SELECT_ALL,
        Duration::from_secs(3),
    )
    .await;
    hard_click(
        driver,
        "action dropdown",
        selectors::ACTION_DROPDOWN,
        Duration::from_secs(EXPORT_MENU_TIMEOUT_SECS),
    )
    .await?;
    hard_click(
        driver,
        "'Generate Shareable Link' option",
        selectors::SHAREABLE_LINK_OPTION,
        Duration::from_secs(EXPORT_STEP_TIMEOUT_SECS),
    )
    .await?;

    // The vendor computes the report server-side and exposes no completion
    // signal to poll; a conservative fixed dwell is the only option.
    info!(
        "report requested; waiting {}s for server-side generation",
        state.config.report_dwell_secs
    );
    sleep(Duration::from_secs(state.config.report_dwell_secs)).await;

    hard_click(
        driver,
        "'Completed' filter",
        selectors::COMPLETED_MULTISELECT,
        Duration::from_secs(EXPORT_STEP_TIMEOUT_SECS),
    )
    .await?;
    hard_click(
        driver,
        "completion checkbox",
        selectors::MULTISELECT_CHECKBOX,
        Duration::from_secs(EXPORT_STEP_TIMEOUT_SECS),
    )
    .await?;
    hard_click(
        driver,
        "'Download results' control",
        selectors::DOWNLOAD_RESULTS,
        Duration::from_secs(EXPORT_MENU_TIMEOUT_SECS),
    )
    .await?;
    // Spreadsheet output, never the default CSV.
    hard_click(
        driver,
        "Excel format option",
        selectors::EXCEL_FORMAT,
        Duration::from_secs(EXPORT_STEP_TIMEOUT_SECS * 4),
    )
    .await?;
    hard_click(
        driver,
        "download button",
        selectors::DOWNLOAD_BUTTON,
        Duration::from_secs(EXPORT_STEP_TIMEOUT_SECS),
    )
    .await?;

    let downloaded =
        download::await_download(staging, Duration::from_secs(DOWNLOAD_WAIT_TIMEOUT_SECS)).await?;
    let seed = request.filename_seed();
    let display = download::save_and_register(
        &state.files,
        &downloaded,
        seed.as_deref(),
        &request.course,
        &request.test,
    )
    .await?;

    dismiss_dialogs(driver).await;
    Ok(format!("downloaded report '{display}'"))
}

async fn hard_click(
    driver: &WebDriver,
    target: &str,
    candidates: &[super::locate::Candidate],
    timeout: Duration,
) -> Result<(), AgentError> {
    let element = locate(driver, target, candidates, timeout)
        .await
        .map_err(|e| AgentError::DownloadFailed(format!("{target}: {e}")))?;
    let _ = element.scroll_into_view().await;
    element
        .click()
        .await
        .map_err(|e| AgentError::DownloadFailed(format!("{target}: {e}")))?;
    Ok(())
}

/// The vendor leaves up to two stacked dialogs open after a download; close
/// them best-effort so the cooldown leaves a clean page behind.
async fn dismiss_dialogs(driver: &WebDriver) {
    sleep(Duration::from_secs(DIALOG_DISMISS_DELAY_SECS)).await;
    for _ in 0..2 {
        let clicked = click_optional(
            driver,
            "dialog close",
            selectors::DIALOG_CLOSE,
            Duration::from_secs(5),
        )
        .await;
        if !clicked {
            let _ = driver.execute(selectors::DIALOG_CLOSE_JS, Vec::new()).await;
        }
        sleep(Duration::from_secs(2)).await;
    }
}
