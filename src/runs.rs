use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thirtyfour::WebDriver;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Shared view of a run's cancellation flag. The flag only transitions
/// false → true; it is never reset.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One in-flight automation run.
pub struct RunHandle {
    pub cancelled: Arc<AtomicBool>,
    pub started_at: DateTime<Utc>,
    /// Present once LAUNCH_BROWSER succeeds; taken by `cancel` so the
    /// browser can be closed out-of-band.
    pub browser: Option<WebDriver>,
}

/// Registry of active automation runs, enabling out-of-band cancellation.
pub struct RunRegistry {
    runs: RwLock<HashMap<Uuid, RunHandle>>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }

    /// Track a new run. The browser handle is attached later, once launched.
    pub async fn create(&self) -> (Uuid, CancelToken) {
        let id = Uuid::new_v4();
        let flag = Arc::new(AtomicBool::new(false));
        let handle = RunHandle {
            cancelled: flag.clone(),
            started_at: Utc::now(),
            browser: None,
        };
        self.runs.write().await.insert(id, handle);
        (id, CancelToken(flag))
    }

    pub async fn attach_browser(&self, id: Uuid, driver: WebDriver) {
        if let Some(handle) = self.runs.write().await.get_mut(&id) {
            handle.browser = Some(driver);
        }
    }

    /// Cancel one run: set its flag and close its browser if one is
    /// attached. Closing is fire-and-forget; the outcome is not awaited.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let mut runs = self.runs.write().await;
        match runs.get_mut(&id) {
            Some(handle) => {
                cancel_handle(id, handle);
                true
            }
            None => false,
        }
    }

    /// Cancel every currently tracked run. Returns how many were cancelled.
    pub async fn cancel_all(&self) -> usize {
        let mut runs = self.runs.write().await;
        let mut cancelled = 0;
        for (id, handle) in runs.iter_mut() {
            cancel_handle(*id, handle);
            cancelled += 1;
        }
        cancelled
    }

    /// Drop a run from the registry. Called unconditionally when the run's
    /// background task terminates, whatever the outcome.
    pub async fn remove(&self, id: Uuid) {
        self.runs.write().await.remove(&id);
    }

    pub async fn active_count(&self) -> usize {
        self.runs.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_cancelled(&self, id: Uuid) -> Option<bool> {
        self.runs
            .read()
            .await
            .get(&id)
            .map(|h| h.cancelled.load(Ordering::Relaxed))
    }
}

fn cancel_handle(id: Uuid, handle: &mut RunHandle) {
    handle.cancelled.store(true, Ordering::Relaxed);
    if let Some(driver) = handle.browser.take() {
        tokio::spawn(async move {
            if let Err(e) = driver.quit().await {
                warn!("run {id}: closing browser after cancel failed: {e}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_starts_uncancelled() {
        let registry = RunRegistry::new();
        let (id, token) = registry.create().await;
        assert!(!token.is_cancelled());
        assert_eq!(registry.is_cancelled(id).await, Some(false));
        assert_eq!(registry.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_sets_flag_once() {
        let registry = RunRegistry::new();
        let (id, token) = registry.create().await;
        assert!(registry.cancel(id).await);
        assert!(token.is_cancelled());
        // Cancelling again is harmless; the flag never resets.
        assert!(registry.cancel(id).await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_unknown_run_reports_false() {
        let registry = RunRegistry::new();
        assert!(!registry.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_cancel_all_counts_every_run() {
        let registry = RunRegistry::new();
        let (_, t1) = registry.create().await;
        let (_, t2) = registry.create().await;
        assert_eq!(registry.cancel_all().await, 2);
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_all_with_no_runs_is_zero() {
        let registry = RunRegistry::new();
        assert_eq!(registry.cancel_all().await, 0);
    }

    #[tokio::test]
    async fn test_remove_forgets_run() {
        let registry = RunRegistry::new();
        let (id, token) = registry.create().await;
        registry.remove(id).await;
        assert_eq!(registry.active_count().await, 0);
        // The token outlives the registry entry.
        assert!(!token.is_cancelled());
    }
}
