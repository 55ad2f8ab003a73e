//! External editor launching.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};

use tracing::info;

use inkvault_common::{Error, Result};

/// Launch an editor on the workspace root and return the child process.
///
/// The command is split on whitespace; the first token is the program, the
/// rest are arguments, and the workspace path is appended last. No shell
/// is involved.
///
/// # Errors
/// - [`Error::InvalidInput`] if the command is empty
/// - [`Error::EditorNotFound`] if the program does not exist
pub fn launch_editor(command: &str, workspace_root: &Path) -> Result<Child> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::InvalidInput("Editor command is empty".to_string()))?;

    match Command::new(program).args(parts).arg(workspace_root).spawn() {
        Ok(child) => {
            info!(editor = program, workspace = %workspace_root.display(), "Editor launched");
            Ok(child)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(Error::EditorNotFound(PathBuf::from(program)))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_editor() {
        let dir = tempfile::tempdir().unwrap();

        let result = launch_editor("definitely-not-an-editor-7f3a", dir.path());
        assert!(matches!(result, Err(Error::EditorNotFound(_))));
    }

    #[test]
    fn test_empty_command() {
        let dir = tempfile::tempdir().unwrap();

        let result = launch_editor("   ", dir.path());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_and_wait() {
        let dir = tempfile::tempdir().unwrap();

        // `sh -c true <workspace>` exits immediately with status 0
        let mut child = launch_editor("sh -c true", dir.path()).unwrap();
        let status = child.wait().unwrap();
        assert!(status.success());
    }
}
