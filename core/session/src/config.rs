//! Session configuration.

use std::path::PathBuf;
use std::time::Duration;

use inkvault_io::DEFAULT_PASSES;

/// Prefix for workspace directory names, used both when creating them and
/// when scanning for leftovers after a crash.
pub const WORKSPACE_PREFIX: &str = "workspace_";

/// How long `lock` waits for the watcher thread before abandoning it.
pub const WATCHER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings for a session. Injected into [`crate::SessionManager`]
/// rather than read from global state, so shells and tests can each point
/// sessions at their own scratch space.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory under which workspaces are created.
    pub scratch_dir: PathBuf,
    /// Workspace directory name prefix.
    pub workspace_prefix: String,
    /// Overwrite passes used when destroying plaintext.
    pub secure_delete_passes: u32,
    /// Bound on watcher shutdown during `lock`.
    pub watcher_stop_timeout: Duration,
    /// Automatically lock after this much idle time. `None` disables
    /// auto-lock; enforcement is up to the shell driving the session.
    pub auto_lock_timeout: Option<Duration>,
    /// Editor command to launch on the open workspace, if any.
    pub editor_command: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let scratch_dir = dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("inkvault")
            .join("workspace");
        Self {
            scratch_dir,
            workspace_prefix: WORKSPACE_PREFIX.to_string(),
            secure_delete_passes: DEFAULT_PASSES,
            watcher_stop_timeout: WATCHER_STOP_TIMEOUT,
            auto_lock_timeout: None,
            editor_command: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();

        assert!(config.scratch_dir.ends_with("inkvault/workspace"));
        assert_eq!(config.workspace_prefix, "workspace_");
        assert_eq!(config.secure_delete_passes, DEFAULT_PASSES);
        assert!(config.auto_lock_timeout.is_none());
        assert!(config.editor_command.is_none());
    }
}
