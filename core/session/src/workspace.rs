//! Plaintext scratch workspace.
//!
//! A workspace is the only place decrypted notes ever touch disk. It lives
//! under the configured scratch directory, carries a random ID so parallel
//! sessions cannot collide, and is securely destroyed when the session
//! locks. Workspaces that survive a crash are found again by their name
//! prefix and purged before any new session starts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use inkvault_common::{BlockedPaths, Error, NodeId, Result, SecretBytes};
use inkvault_io::{hash_file, secure_delete_directory};
use inkvault_vault::{NodeKind, VaultIndex};

use crate::config::SessionConfig;

/// Extension collected by [`Workspace::list_notes`].
pub const NOTE_EXT: &str = "md";

const WORKSPACE_ID_LENGTH: usize = 8;

/// A temporary directory of decrypted notes.
pub struct Workspace {
    id: String,
    root: PathBuf,
    baselines: HashMap<String, String>,
}

impl Workspace {
    /// Create a fresh workspace directory under the configured scratch dir.
    ///
    /// # Errors
    /// - [`Error::Io`] with `AlreadyExists` if the directory is somehow
    ///   taken, or on any other filesystem failure
    pub fn create(config: &SessionConfig) -> Result<Self> {
        let hex = Uuid::new_v4().simple().to_string();
        let id = hex[..WORKSPACE_ID_LENGTH].to_string();
        let root = config
            .scratch_dir
            .join(format!("{}{}", config.workspace_prefix, id));

        fs::create_dir_all(&config.scratch_dir)?;
        fs::create_dir(&root)?;

        debug!(workspace = %root.display(), "Workspace created");
        Ok(Self {
            id,
            root,
            baselines: HashMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Create the folder structure described by the index.
    ///
    /// Only folders are touched; note contents are written separately.
    pub fn materialize_tree(&self, index: &VaultIndex) -> Result<()> {
        for node in index.nodes() {
            if node.kind == NodeKind::Folder {
                let rel = index.get_path(&node.id)?;
                fs::create_dir_all(self.resolve(&rel))?;
            }
        }
        Ok(())
    }

    /// Write decrypted note content for an index node, creating parent
    /// directories as needed.
    pub fn write_note(
        &self,
        index: &VaultIndex,
        node_id: &NodeId,
        content: &SecretBytes,
    ) -> Result<()> {
        let rel = index.get_path(node_id)?;
        let path = self.resolve(&rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content.as_bytes())?;
        Ok(())
    }

    /// Read note content at a workspace-relative path.
    pub fn read_note(&self, rel_path: &str) -> Result<SecretBytes> {
        Ok(SecretBytes::new(fs::read(self.resolve(rel_path))?))
    }

    /// All note files currently in the workspace, as sorted `/`-joined
    /// paths relative to the workspace root.
    ///
    /// Only `.md` files count as notes; anything else an editor drops in
    /// here is never encrypted and simply dies with the workspace.
    pub fn list_notes(&self) -> Result<Vec<String>> {
        let mut notes = Vec::new();
        if self.root.is_dir() {
            collect_notes(&self.root, String::new(), &mut notes)?;
        }
        notes.sort();
        Ok(notes)
    }

    /// SHA-256 of the note at a workspace-relative path.
    pub fn hash_note(&self, rel_path: &str) -> Result<String> {
        hash_file(&self.resolve(rel_path))
    }

    /// Record the on-disk hash a note had when the session opened.
    pub fn record_baseline(&mut self, rel_path: String, hash: String) {
        self.baselines.insert(rel_path, hash);
    }

    /// The recorded baseline hash for a note, if it was tracked.
    pub fn baseline_hash(&self, rel_path: &str) -> Option<&str> {
        self.baselines.get(rel_path).map(String::as_str)
    }

    /// Securely delete the whole workspace.
    ///
    /// A missing directory is a no-op, so calling this twice is safe.
    ///
    /// # Errors
    /// - [`Error::DeletionBlocked`] listing every path still on disk
    pub fn destroy(&self, passes: u32) -> Result<()> {
        secure_delete_directory(&self.root, passes)?;
        debug!(workspace = %self.root.display(), "Workspace destroyed");
        Ok(())
    }

    fn resolve(&self, rel_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in rel_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

fn collect_notes(dir: &Path, prefix: String, notes: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // A lossily converted name would not resolve back to the entry
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = %path.display(), "Skipping non-UTF-8 name in workspace");
            continue;
        };
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        if path.is_dir() {
            collect_notes(&path, rel, notes)?;
        } else if path.extension().is_some_and(|ext| ext == NOTE_EXT) {
            notes.push(rel);
        }
    }
    Ok(())
}

/// Workspace directories left behind under the scratch dir, sorted.
///
/// Anything matching the configured prefix counts; after a crash these
/// still hold plaintext and must be purged before trusting the machine
/// again.
pub fn find_stale_workspaces(config: &SessionConfig) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    if !config.scratch_dir.is_dir() {
        return Ok(found);
    }

    for entry in fs::read_dir(&config.scratch_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_workspace = entry
            .file_name()
            .to_string_lossy()
            .starts_with(&config.workspace_prefix);
        if is_workspace && path.is_dir() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Securely delete every stale workspace. Returns the purged paths.
///
/// Failures are aggregated across workspaces; a single stuck file never
/// stops the remaining workspaces from being scrubbed.
///
/// # Errors
/// - [`Error::DeletionBlocked`] listing everything that survived
pub fn purge_stale_workspaces(config: &SessionConfig) -> Result<Vec<PathBuf>> {
    let mut purged = Vec::new();
    let mut blocked: Vec<(PathBuf, String)> = Vec::new();

    for path in find_stale_workspaces(config)? {
        match secure_delete_directory(&path, config.secure_delete_passes) {
            Ok(()) => {
                debug!(workspace = %path.display(), "Stale workspace purged");
                purged.push(path);
            }
            Err(Error::DeletionBlocked(paths)) => {
                warn!("Stale workspace {} not fully purged: {}", path.display(), paths);
                blocked.extend(paths.entries().iter().cloned());
            }
            Err(e) => {
                warn!("Failed to purge stale workspace {}: {}", path.display(), e);
                blocked.push((path, e.to_string()));
            }
        }
    }

    if !blocked.is_empty() {
        return Err(Error::DeletionBlocked(BlockedPaths::new(blocked)));
    }
    Ok(purged)
}
