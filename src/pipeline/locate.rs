use std::time::Duration;
use thirtyfour::{By, WebDriver, WebElement};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::LOCATE_POLL_INTERVAL_MS;
use crate::error::AgentError;

/// One way of finding a logical UI target. The vendor markup is unstable,
/// so every target carries an ordered list of these; they are tried in
/// order at each poll tick until one resolves or the deadline passes.
#[derive(Debug, Clone, Copy)]
pub enum Candidate {
    Css(&'static str),
    XPath(&'static str),
    /// CSS selector narrowed to elements whose visible text contains the
    /// needle, case-insensitively.
    CssWithText(&'static str, &'static str),
}

impl Candidate {
    async fn resolve(&self, driver: &WebDriver) -> Option<WebElement> {
        match self {
            Candidate::Css(css) => first_displayed(driver, By::Css(*css)).await,
            Candidate::XPath(xpath) => first_displayed(driver, By::XPath(*xpath)).await,
            Candidate::CssWithText(css, needle) => {
                first_with_text(driver, *css, needle).await
            }
        }
    }
}

async fn first_displayed(driver: &WebDriver, by: By) -> Option<WebElement> {
    let elements = driver.find_all(by).await.ok()?;
    for element in elements {
        if element.is_displayed().await.unwrap_or(false) {
            return Some(element);
        }
    }
    None
}

async fn first_with_text(driver: &WebDriver, css: &str, needle: &str) -> Option<WebElement> {
    let needle = normalize_ws(needle).to_lowercase();
    let elements = driver.find_all(By::Css(css)).await.ok()?;
    for element in elements {
        let text = element.text().await.unwrap_or_default();
        if normalize_ws(&text).to_lowercase().contains(&needle)
            && element.is_displayed().await.unwrap_or(false)
        {
            return Some(element);
        }
    }
    None
}

/// Collapse internal whitespace runs and trim, so partial text matches are
/// insensitive to the vendor's layout-driven whitespace.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a target through its candidate list within `timeout`. Required
/// targets call this and treat the error as fatal to the stage.
pub async fn locate(
    driver: &WebDriver,
    target: &str,
    candidates: &[Candidate],
    timeout: Duration,
) -> Result<WebElement, AgentError> {
    let deadline = Instant::now() + timeout;
    loop {
        for candidate in candidates {
            if let Some(element) = candidate.resolve(driver).await {
                return Ok(element);
            }
        }
        if Instant::now() >= deadline {
            return Err(AgentError::ElementNotFound(target.to_string()));
        }
        sleep(Duration::from_millis(LOCATE_POLL_INTERVAL_MS)).await;
    }
}

/// Like `locate` but for optional navigational targets: absence is logged
/// and swallowed.
pub async fn try_locate(
    driver: &WebDriver,
    target: &str,
    candidates: &[Candidate],
    timeout: Duration,
) -> Option<WebElement> {
    match locate(driver, target, candidates, timeout).await {
        Ok(element) => Some(element),
        Err(_) => {
            debug!("{target}: not found, skipping");
            None
        }
    }
}

/// Resolve a target by runtime text: the first displayed element matching
/// `css` whose text contains `needle` case-insensitively.
pub async fn locate_text(
    driver: &WebDriver,
    target: &str,
    css: &'static str,
    needle: &str,
    timeout: Duration,
) -> Result<WebElement, AgentError> {
    let wanted = normalize_ws(needle).to_lowercase();
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(elements) = driver.find_all(By::Css(css)).await {
            for element in elements {
                let text = element.text().await.unwrap_or_default();
                if normalize_ws(&text).to_lowercase().contains(&wanted)
                    && element.is_displayed().await.unwrap_or(false)
                {
                    return Ok(element);
                }
            }
        }
        if Instant::now() >= deadline {
            return Err(AgentError::ElementNotFound(format!(
                "{target} matching '{needle}'"
            )));
        }
        sleep(Duration::from_millis(LOCATE_POLL_INTERVAL_MS)).await;
    }
}

/// Click an optional target; returns whether the click happened.
pub async fn click_optional(
    driver: &WebDriver,
    target: &str,
    candidates: &[Candidate],
    timeout: Duration,
) -> bool {
    match try_locate(driver, target, candidates, timeout).await {
        Some(element) => match element.click().await {
            Ok(()) => true,
            Err(e) => {
                debug!("{target}: click failed, skipping: {e}");
                false
            }
        },
        None => false,
    }
}
