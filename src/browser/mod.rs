use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thirtyfour::{ChromeCapabilities, ChromiumLikeCapabilities, WebDriver};
use tracing::{info, warn};

use crate::config::{AgentConfig, CHROMEDRIVER_SPAWN_WAIT_MS};
use crate::error::AgentError;

/// Find a system-installed Chrome/Chromium executable.
pub fn find_chrome_exe() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "windows")]
    {
        for var in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(base) = std::env::var(var) {
                candidates.push(
                    PathBuf::from(base).join("Google/Chrome/Application/chrome.exe"),
                );
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
        if let Some(home) = dirs::home_dir() {
            candidates.push(
                home.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            );
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        candidates.push(PathBuf::from("/usr/bin/google-chrome"));
        candidates.push(PathBuf::from("/usr/bin/chromium-browser"));
        candidates.push(PathBuf::from("/usr/bin/chromium"));
    }

    candidates.into_iter().find(|p| p.is_file())
}

/// Plain local browser-open of a URL, used when no credentials are given.
/// The spawned process is not tracked.
pub fn open_in_chrome(url: &str) -> Result<String, AgentError> {
    let chrome = find_chrome_exe().ok_or_else(|| {
        AgentError::BrowserUnavailable(
            "Google Chrome not found. Please install Chrome or provide the path.".to_string(),
        )
    })?;
    std::process::Command::new(&chrome)
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AgentError::BrowserUnavailable(format!("Failed to launch Chrome: {e}")))?;
    Ok(format!("Opened in Chrome: {url}"))
}

fn build_caps(config: &AgentConfig, staging_dir: &Path) -> Result<ChromeCapabilities, AgentError> {
    let mut caps = ChromeCapabilities::new();
    // Prefer the operator's installed Chrome; otherwise chromedriver picks
    // its own default browser.
    if let Some(chrome) = find_chrome_exe() {
        caps.set_binary(&chrome.to_string_lossy())?;
    }
    if config.headless {
        caps.add_arg("--headless=new")?;
    }
    caps.add_arg("--no-first-run")?;
    let prefs = serde_json::json!({
        "download.default_directory": staging_dir.to_string_lossy(),
        "download.prompt_for_download": false,
        "safebrowsing.enabled": true,
    });
    caps.add_experimental_option("prefs", prefs)?;
    Ok(caps)
}

/// Acquire a browser session for one run. Tries the configured WebDriver
/// endpoint first; if unreachable, spawns a local chromedriver and retries
/// once before giving up with `BrowserUnavailable`.
pub async fn launch(config: &AgentConfig, staging_dir: &Path) -> Result<WebDriver, AgentError> {
    let caps = build_caps(config, staging_dir)?;
    match WebDriver::new(&config.webdriver_url, caps).await {
        Ok(driver) => Ok(driver),
        Err(first_err) => {
            warn!(
                "no session at {} ({first_err}); spawning chromedriver",
                config.webdriver_url
            );
            spawn_chromedriver(&config.webdriver_url).await?;
            let caps = build_caps(config, staging_dir)?;
            WebDriver::new(&config.webdriver_url, caps)
                .await
                .map_err(|e| {
                    AgentError::BrowserUnavailable(format!(
                        "could not start a browser session at {}: {e}",
                        config.webdriver_url
                    ))
                })
        }
    }
}

/// Spawn a chromedriver serving the configured endpoint's port. The child
/// is left running for the lifetime of the agent so later runs reuse it.
async fn spawn_chromedriver(webdriver_url: &str) -> Result<(), AgentError> {
    let port = url::Url::parse(webdriver_url)
        .ok()
        .and_then(|u| u.port())
        .unwrap_or(9515);
    let child = tokio::process::Command::new("chromedriver")
        .arg(format!("--port={port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            AgentError::BrowserUnavailable(format!("chromedriver is not available: {e}"))
        })?;
    info!("spawned chromedriver on port {port} (pid {:?})", child.id());
    tokio::time::sleep(Duration::from_millis(CHROMEDRIVER_SPAWN_WAIT_MS)).await;
    Ok(())
}
