use std::sync::Arc;

use crate::config::AgentConfig;
use crate::files::FileRegistry;
use crate::runs::RunRegistry;

pub type SharedState = Arc<AgentState>;

/// Process-wide state: configuration plus the two in-memory registries.
/// Nothing here persists across restarts.
pub struct AgentState {
    pub config: AgentConfig,
    pub files: FileRegistry,
    pub runs: RunRegistry,
}

impl AgentState {
    pub fn new(config: AgentConfig) -> Self {
        let files = FileRegistry::new(config.downloads_dir.clone());
        Self {
            config,
            files,
            runs: RunRegistry::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliArgs, COOLDOWN_SECS_DEFAULT, DEFAULT_HTTP_PORT};
    use clap::Parser;

    fn test_config() -> AgentConfig {
        AgentConfig::from_args(CliArgs::parse_from(["lms-report-agent"]))
    }

    #[test]
    fn test_state_construction_defaults() {
        let state = AgentState::new(test_config());
        assert_eq!(state.config.port, DEFAULT_HTTP_PORT);
        assert_eq!(state.config.cooldown_secs, COOLDOWN_SECS_DEFAULT);
        assert_eq!(
            state.files.downloads_dir(),
            std::path::Path::new("server_downloads")
        );
    }

    #[tokio::test]
    async fn test_state_registries_start_empty() {
        let state = AgentState::new(test_config());
        assert_eq!(state.runs.active_count().await, 0);
        assert!(state.files.list().await.is_empty());
    }

    #[test]
    fn test_staging_dir_is_per_run() {
        let state = AgentState::new(test_config());
        let a = state.config.staging_dir(uuid::Uuid::new_v4());
        let b = state.config.staging_dir(uuid::Uuid::new_v4());
        assert_ne!(a, b);
    }
}
