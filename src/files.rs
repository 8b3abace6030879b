use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AgentError;

/// Metadata for one spreadsheet report fetched by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedFile {
    pub filename: String,
    pub original_name: String,
    pub course_name: String,
    pub test_name: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

/// API shape for one registry entry. `filename` is the user-facing name,
/// matching what a re-download will be saved as.
#[derive(Debug, Clone, Serialize)]
pub struct FileListing {
    pub id: String,
    pub filename: String,
    pub course_name: String,
    pub test_name: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
}

/// In-memory registry of downloaded report files. Entries are rebuilt empty
/// on restart; the files themselves outlive the registry on disk.
pub struct FileRegistry {
    downloads_dir: PathBuf,
    entries: RwLock<HashMap<String, DownloadedFile>>,
}

impl FileRegistry {
    pub fn new(downloads_dir: PathBuf) -> Self {
        Self {
            downloads_dir,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Register a downloaded file and return its identifier.
    pub async fn register(
        &self,
        path: &Path,
        original_name: &str,
        course_name: &str,
        test_name: &str,
    ) -> String {
        let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let id = format!("{}_{}", Utc::now().timestamp(), filename);
        let entry = DownloadedFile {
            filename,
            original_name: original_name.to_string(),
            course_name: course_name.to_string(),
            test_name: test_name.to_string(),
            timestamp: Utc::now(),
            size,
        };
        self.entries.write().await.insert(id.clone(), entry);
        id
    }

    /// All entries whose backing file still exists, newest first. Entries
    /// whose file is gone are purged as a side effect; the purge happens in
    /// the same write-lock section as the snapshot so concurrent
    /// register/remove calls cannot observe a half-purged map.
    pub async fn list(&self) -> Vec<FileListing> {
        let mut entries = self.entries.write().await;
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, meta)| !self.downloads_dir.join(&meta.filename).exists())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            debug!("purging stale registry entry {id}");
            entries.remove(id);
        }
        let mut files: Vec<FileListing> = entries
            .iter()
            .map(|(id, meta)| FileListing {
                id: id.clone(),
                filename: meta.original_name.clone(),
                course_name: meta.course_name.clone(),
                test_name: meta.test_name.clone(),
                timestamp: meta.timestamp,
                size: meta.size,
            })
            .collect();
        files.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        files
    }

    /// Remove a metadata entry. The underlying file is left on disk.
    pub async fn remove(&self, id: &str) -> Result<(), AgentError> {
        if self.entries.write().await.remove(id).is_some() {
            Ok(())
        } else {
            Err(AgentError::NotFound)
        }
    }

    /// Resolve an identifier to the on-disk path and display name. Purges
    /// the entry if the backing file has vanished.
    pub async fn resolve(&self, id: &str) -> Result<(PathBuf, String), AgentError> {
        let meta = self
            .entries
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(AgentError::NotFound)?;
        let path = self.downloads_dir.join(&meta.filename);
        if !path.exists() {
            self.entries.write().await.remove(id);
            return Err(AgentError::NotFound);
        }
        Ok((path, meta.original_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_id_embeds_filename() {
        let registry = FileRegistry::new(std::env::temp_dir());
        let id = registry
            .register(Path::new("/nonexistent/1700000000_Midterm.xlsx"), "Midterm.xlsx", "", "")
            .await;
        assert!(id.ends_with("_1700000000_Midterm.xlsx"));
    }

    #[tokio::test]
    async fn test_register_missing_file_has_zero_size() {
        let registry = FileRegistry::new(std::env::temp_dir());
        let id = registry
            .register(Path::new("/nonexistent/report.xlsx"), "report.xlsx", "", "")
            .await;
        let entries = registry.entries.read().await;
        assert_eq!(entries.get(&id).unwrap().size, 0);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_not_found() {
        let registry = FileRegistry::new(std::env::temp_dir());
        assert!(matches!(
            registry.remove("missing").await,
            Err(AgentError::NotFound)
        ));
    }
}
