//! Session engine for InkVault.
//!
//! This module provides:
//! - The unlock/lock state machine that moves a vault between its sealed
//!   at-rest form and a plaintext scratch workspace
//! - Workspace lifecycle (materialize, track, securely destroy)
//! - A best-effort filesystem watcher over the open workspace
//! - External editor launching
//! - Crash recovery for workspaces left behind by a dead process
//!
//! # Security
//! Plaintext exists only inside the workspace directory, and only between
//! `unlock` and `lock`. The vault key lives in memory for the same window
//! and is zeroized when the session locks or is dropped.
//!
//! # Concurrency
//! A [`SessionManager`] owns at most one workspace and one vault key, and
//! every operation runs to completion on the calling thread. The vault
//! directory is assumed single-writer: nothing here guards against two
//! processes unlocking the same vault, so callers that need that must add
//! an external advisory lock.

pub mod config;
pub mod editor;
pub mod manager;
pub mod watcher;
pub mod workspace;

pub use config::SessionConfig;
pub use editor::launch_editor;
pub use manager::{LockReport, SessionManager, SessionState, VaultTreeEntry};
pub use watcher::WorkspaceWatcher;
pub use workspace::{find_stale_workspaces, purge_stale_workspaces, Workspace};
