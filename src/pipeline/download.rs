use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

use crate::config::DOWNLOAD_POLL_INTERVAL_MS;
use crate::error::AgentError;
use crate::files::FileRegistry;

/// Wait for the browser to finish writing a file into the staging
/// directory. Chrome writes `.crdownload` partials until the download
/// completes, so the first non-partial regular file is the report.
pub async fn await_download(staging: &Path, timeout: Duration) -> Result<PathBuf, AgentError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(path) = completed_file(staging).await? {
            return Ok(path);
        }
        if Instant::now() >= deadline {
            return Err(AgentError::DownloadFailed(format!(
                "no file appeared in {} within {}s",
                staging.display(),
                timeout.as_secs()
            )));
        }
        sleep(Duration::from_millis(DOWNLOAD_POLL_INTERVAL_MS)).await;
    }
}

async fn completed_file(dir: &Path) -> Result<Option<PathBuf>, AgentError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".crdownload") || name.ends_with(".part") || name.ends_with(".tmp") {
            continue;
        }
        return Ok(Some(entry.path()));
    }
    Ok(None)
}

/// Move a completed download into the server-side directory under a unique
/// timestamped name and register it. `seed` is the sanitized stem chosen by
/// the user; without it the vendor's suggested name is kept. Returns the
/// user-facing display name.
pub async fn save_and_register(
    files: &FileRegistry,
    downloaded: &Path,
    seed: Option<&str>,
    course: &str,
    test: &str,
) -> Result<String, AgentError> {
    let suggested = downloaded
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "report.xlsx".to_string());
    let extension = downloaded
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_else(|| ".xlsx".to_string());
    let timestamp = Utc::now().timestamp();

    let (unique_name, display_name) = match seed {
        Some(seed) => (
            format!("{timestamp}_{seed}{extension}"),
            format!("{seed}{extension}"),
        ),
        None => {
            let stem = downloaded
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "report".to_string());
            (format!("{timestamp}_{stem}{extension}"), suggested)
        }
    };

    tokio::fs::create_dir_all(files.downloads_dir()).await?;
    let target = files.downloads_dir().join(&unique_name);
    // rename fails across filesystems (staging lives in the temp dir); fall
    // back to copy + delete.
    if tokio::fs::rename(downloaded, &target).await.is_err() {
        tokio::fs::copy(downloaded, &target).await?;
        let _ = tokio::fs::remove_file(downloaded).await;
    }

    let id = files.register(&target, &display_name, course, test).await;
    info!("saved report {} as {} (id {id})", display_name, target.display());
    Ok(display_name)
}
