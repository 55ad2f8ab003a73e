//! Session state machine.
//!
//! A [`SessionManager`] moves one vault between its sealed at-rest form
//! and an editable plaintext workspace:
//!
//! ```text
//! Locked -> Unlocking -> Unlocked -> Locking -> Locked
//! ```
//!
//! `unlock` decrypts the index and every note into a fresh workspace;
//! `lock` rescans the workspace, re-encrypts what changed, folds new and
//! deleted notes back into the index, and securely destroys the
//! workspace. At most one workspace and one vault key exist at a time,
//! and the key is zeroized as soon as the session returns to `Locked`.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use inkvault_common::{Error, NodeId, Result, SecretBytes};
use inkvault_crypto::{
    aead, derive_file_key, derive_master_key, derive_vault_key, Container, ContainerHeader,
    ContentType, Salt, VaultKey,
};
use inkvault_io::atomic_write;
use inkvault_vault::{NodeKind, VaultIndex, VaultLayout};

use crate::config::SessionConfig;
use crate::watcher::WorkspaceWatcher;
use crate::workspace::Workspace;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No keys or plaintext exist.
    Locked,
    /// `unlock` is in progress.
    Unlocking,
    /// Keys are live and the workspace holds plaintext.
    Unlocked,
    /// `lock` is in progress.
    Locking,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Locked => "locked",
            SessionState::Unlocking => "unlocking",
            SessionState::Unlocked => "unlocked",
            SessionState::Locking => "locking",
        })
    }
}

/// What a `lock` call did to the vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockReport {
    /// Existing notes re-encrypted because their content changed.
    pub reencrypted: usize,
    /// Notes created during the session and encrypted for the first time.
    pub added: usize,
    /// Index nodes removed because their note vanished from the workspace.
    pub removed: usize,
}

/// One node of the display tree returned by [`SessionManager::tree`].
///
/// Children are sorted folders first, then by name.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultTreeEntry {
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<VaultTreeEntry>,
}

/// Everything that only exists while the session is unlocked. Dropping
/// this zeroizes the vault key.
struct Unlocked {
    vault_key: VaultKey,
    salt: Salt,
    index: VaultIndex,
    workspace: Workspace,
    watcher: Option<WorkspaceWatcher>,
}

/// Drives unlock/lock sessions for a single vault.
pub struct SessionManager {
    layout: VaultLayout,
    config: SessionConfig,
    state: SessionState,
    unlocked: Option<Unlocked>,
}

impl SessionManager {
    /// Create a manager for the vault at `vault_path`. No I/O happens
    /// until `unlock`.
    pub fn new(vault_path: impl Into<PathBuf>, config: SessionConfig) -> Self {
        Self {
            layout: VaultLayout::new(vault_path),
            config,
            state: SessionState::Locked,
            unlocked: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == SessionState::Unlocked
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Root of the open workspace, while unlocked.
    pub fn workspace_root(&self) -> Option<&Path> {
        self.unlocked.as_ref().map(|u| u.workspace.root())
    }

    /// Filesystem events the watcher has seen, while one is running.
    pub fn watcher_events(&self) -> Option<u64> {
        self.unlocked
            .as_ref()
            .and_then(|u| u.watcher.as_ref())
            .map(WorkspaceWatcher::events_seen)
    }

    /// Unlock the vault into a fresh workspace.
    ///
    /// # Preconditions
    /// - Session must be `Locked`
    ///
    /// # Postconditions
    /// - On success the session is `Unlocked`, the workspace holds every
    ///   decrypted note, and baseline hashes are recorded
    /// - On failure the session is `Locked` again and any partially
    ///   populated workspace has been securely destroyed
    ///
    /// # Errors
    /// - [`Error::Session`] when not `Locked`
    /// - [`Error::VaultNotFound`] when marker or index are missing
    /// - [`Error::AuthenticationFailure`] on a wrong password or tampered
    ///   vault data
    /// - [`Error::MalformedHeader`] when the stored index advertises a
    ///   crypto profile this engine does not use
    /// - [`Error::CorruptIndex`] when the decrypted index is inconsistent
    pub fn unlock(&mut self, password: &[u8]) -> Result<()> {
        if self.state != SessionState::Locked {
            return Err(Error::Session(format!(
                "Cannot unlock while {}",
                self.state
            )));
        }
        self.state = SessionState::Unlocking;

        match self.try_unlock(password) {
            Ok(unlocked) => {
                info!(
                    vault = %self.layout.root().display(),
                    workspace = %unlocked.workspace.root().display(),
                    notes = unlocked.index.len(),
                    "Session unlocked"
                );
                self.unlocked = Some(unlocked);
                self.state = SessionState::Unlocked;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Locked;
                Err(e)
            }
        }
    }

    /// Lock the vault: reconcile the workspace back into encrypted form,
    /// then destroy the plaintext.
    ///
    /// # Preconditions
    /// - Session must be `Unlocked`
    ///
    /// # Postconditions
    /// - On success every change is sealed, the workspace is gone, the
    ///   vault key is zeroized, and the session is `Locked`
    /// - If reconciliation fails or the workspace cannot be fully
    ///   destroyed, the session returns to `Unlocked` with keys retained
    ///   so the caller can retry
    ///
    /// # Errors
    /// - [`Error::Session`] when not `Unlocked`
    /// - [`Error::NoteShadowsFolder`] when a workspace file occupies a
    ///   path the index maps to a folder; nothing has been destroyed and
    ///   the note can be renamed before retrying
    /// - [`Error::DeletionBlocked`] listing paths still holding plaintext
    pub fn lock(&mut self) -> Result<LockReport> {
        if self.state != SessionState::Unlocked {
            return Err(Error::Session(format!("Cannot lock while {}", self.state)));
        }
        let Some(mut unlocked) = self.unlocked.take() else {
            self.state = SessionState::Locked;
            return Err(Error::Session("No unlocked session data".to_string()));
        };
        self.state = SessionState::Locking;

        if let Some(mut watcher) = unlocked.watcher.take() {
            watcher.stop(self.config.watcher_stop_timeout);
        }

        let report = match reconcile(&self.layout, &mut unlocked) {
            Ok(report) => report,
            Err(e) => {
                self.unlocked = Some(unlocked);
                self.state = SessionState::Unlocked;
                return Err(e);
            }
        };

        if let Err(e) = unlocked.workspace.destroy(self.config.secure_delete_passes) {
            warn!("Workspace not fully destroyed; session stays unlocked: {}", e);
            self.unlocked = Some(unlocked);
            self.state = SessionState::Unlocked;
            return Err(e);
        }

        // Vault key is zeroized here
        drop(unlocked);
        self.state = SessionState::Locked;
        info!(
            reencrypted = report.reencrypted,
            added = report.added,
            removed = report.removed,
            "Session locked"
        );
        Ok(report)
    }

    /// The current note tree for display, while unlocked.
    ///
    /// # Errors
    /// - [`Error::Session`] when not `Unlocked`
    pub fn tree(&self) -> Result<VaultTreeEntry> {
        if self.state != SessionState::Unlocked {
            return Err(Error::Session(format!(
                "Cannot list tree while {}",
                self.state
            )));
        }
        let unlocked = self
            .unlocked
            .as_ref()
            .ok_or_else(|| Error::Session("No unlocked session data".to_string()))?;
        let root = unlocked
            .index
            .root_id()
            .ok_or_else(|| Error::CorruptIndex("No root folder".to_string()))?;
        build_entry(&unlocked.index, root)
            .ok_or_else(|| Error::CorruptIndex("Root node missing".to_string()))
    }

    fn try_unlock(&self, password: &[u8]) -> Result<Unlocked> {
        let vault_id = self.layout.vault_id()?;
        let index_path = self.layout.index_path();
        if !index_path.exists() {
            return Err(Error::VaultNotFound(self.layout.root().to_path_buf()));
        }

        let container = Container::decode(&fs::read(&index_path)?)?;
        // The header only contributes the salt; the KDF cost is fixed and
        // never taken from unauthenticated data
        let (master_key, salt) = derive_master_key(password, Some(&container.header.salt))?;
        let vault_key = derive_vault_key(&master_key, &vault_id);
        let index = VaultIndex::decrypt_from_storage(
            &container.ciphertext,
            &vault_key,
            container.header.nonce.as_bytes(),
        )?;

        let mut workspace = Workspace::create(&self.config)?;
        if let Err(e) = populate_workspace(&self.layout, &index, &vault_key, &mut workspace) {
            if let Err(derr) = workspace.destroy(self.config.secure_delete_passes) {
                warn!("Failed to clean up partial workspace: {}", derr);
            }
            return Err(e);
        }

        // Best effort only; an unlocked session without a watcher is fine
        let watcher = match WorkspaceWatcher::start(workspace.root()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Workspace watcher unavailable: {}", e);
                None
            }
        };

        Ok(Unlocked {
            vault_key,
            salt,
            index,
            workspace,
            watcher,
        })
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if matches!(self.state, SessionState::Unlocked | SessionState::Locking) {
            warn!("Session dropped while unlocked; workspace left for crash recovery");
        }
    }
}

/// Decrypt every indexed note into the workspace and record baselines.
fn populate_workspace(
    layout: &VaultLayout,
    index: &VaultIndex,
    vault_key: &VaultKey,
    workspace: &mut Workspace,
) -> Result<()> {
    workspace.materialize_tree(index)?;

    let mut decrypted = 0usize;
    for node in index.nodes() {
        if node.kind != NodeKind::File {
            continue;
        }
        let blob = layout.blob_path(&node.id);
        if !blob.exists() {
            // Indexed but never written; nothing to materialize
            warn!(node = %node.id, "Encrypted blob missing; skipping");
            continue;
        }

        let container = Container::decode(&fs::read(&blob)?)?;
        let file_key = derive_file_key(vault_key, &node.id);
        let plaintext = aead::decrypt(
            file_key.as_bytes(),
            &container.ciphertext,
            container.header.nonce.as_bytes(),
        )?;
        workspace.write_note(index, &node.id, &plaintext)?;

        let rel = index.get_path(&node.id)?;
        let hash = workspace.hash_note(&rel)?;
        workspace.record_baseline(rel, hash);
        decrypted += 1;
    }

    debug!(notes = decrypted, "Workspace populated");
    Ok(())
}

/// Fold the workspace state back into the encrypted vault.
///
/// The workspace listing is authoritative: changed and untracked notes are
/// re-encrypted under a fresh nonce, unknown paths become new index nodes,
/// and indexed notes missing from the workspace are removed along with
/// their blobs. A note whose path lands on a folder node aborts the pass
/// before anything is destroyed.
fn reconcile(layout: &VaultLayout, unlocked: &mut Unlocked) -> Result<LockReport> {
    let notes = unlocked.workspace.list_notes()?;
    let now = Utc::now().to_rfc3339();
    let mut report = LockReport::default();

    for rel in &notes {
        match unlocked.index.find_by_path(rel).cloned() {
            Some(id) => {
                let Some(node) = unlocked.index.node(&id) else {
                    continue;
                };
                if node.kind != NodeKind::File {
                    // Skipping would let the later destroy erase content
                    // that was never sealed anywhere
                    return Err(Error::NoteShadowsFolder(rel.clone()));
                }
                let current = unlocked.workspace.hash_note(rel)?;
                if unlocked.workspace.baseline_hash(rel) == Some(current.as_str()) {
                    continue;
                }
                // Changed, or never tracked: seal it again either way
                let content = unlocked.workspace.read_note(rel)?;
                seal_note(layout, &unlocked.vault_key, &unlocked.salt, &id, &content)?;
                unlocked
                    .index
                    .set_metadata(&id, "modified_at", Value::String(now.clone()))?;
                report.reencrypted += 1;
            }
            None => {
                let (folders, filename) = split_path(rel)?;
                let parent_id = ensure_folders(&mut unlocked.index, &folders)?;
                let id =
                    unlocked
                        .index
                        .add_node(filename, NodeKind::File, Some(&parent_id), None)?;
                let content = unlocked.workspace.read_note(rel)?;
                seal_note(layout, &unlocked.vault_key, &unlocked.salt, &id, &content)?;
                unlocked
                    .index
                    .set_metadata(&id, "created_at", Value::String(now.clone()))?;
                unlocked
                    .index
                    .set_metadata(&id, "modified_at", Value::String(now.clone()))?;
                report.added += 1;
            }
        }
    }

    let present: HashSet<&str> = notes.iter().map(String::as_str).collect();
    let mut doomed = Vec::new();
    for node in unlocked.index.nodes() {
        if node.kind == NodeKind::File
            && !present.contains(unlocked.index.get_path(&node.id)?.as_str())
        {
            doomed.push(node.id.clone());
        }
    }
    for id in &doomed {
        // Blobs are ciphertext; secure deletion is reserved for plaintext
        let blob = layout.blob_path(id);
        if blob.exists() {
            fs::remove_file(&blob)?;
        }
        unlocked.index.remove_node(id)?;
        report.removed += 1;
    }

    unlocked
        .index
        .save(layout, &unlocked.vault_key, &unlocked.salt)?;
    Ok(report)
}

/// Encrypt note content under its derived file key and atomically replace
/// the blob.
fn seal_note(
    layout: &VaultLayout,
    vault_key: &VaultKey,
    salt: &Salt,
    node_id: &NodeId,
    content: &SecretBytes,
) -> Result<()> {
    let file_key = derive_file_key(vault_key, node_id);
    let (ciphertext, nonce) = aead::encrypt(file_key.as_bytes(), content.as_bytes(), None)?;
    let header = ContainerHeader::new(ContentType::File, node_id.as_str(), salt.clone(), nonce);
    let data = Container::new(header, ciphertext).encode()?;
    atomic_write(&layout.blob_path(node_id), &data)
}

fn split_path(rel: &str) -> Result<(Vec<&str>, &str)> {
    let mut segments: Vec<&str> = rel.split('/').collect();
    let filename = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid note path: {rel:?}")))?;
    Ok((segments, filename))
}

/// Walk (or create) the folder chain for a new note, starting at the root.
fn ensure_folders(index: &mut VaultIndex, segments: &[&str]) -> Result<NodeId> {
    let mut current = index
        .root_id()
        .cloned()
        .ok_or_else(|| Error::CorruptIndex("No root folder".to_string()))?;
    for segment in segments {
        current = match index.child_by_name(&current, segment).cloned() {
            Some(id) => {
                if index.node(&id).is_some_and(|n| n.kind == NodeKind::Folder) {
                    id
                } else {
                    return Err(Error::ParentNotFolder(id));
                }
            }
            None => index.add_node(segment, NodeKind::Folder, Some(&current), None)?,
        };
    }
    Ok(current)
}

fn build_entry(index: &VaultIndex, id: &NodeId) -> Option<VaultTreeEntry> {
    let node = index.node(id)?;
    let mut children: Vec<VaultTreeEntry> = index
        .children(id)
        .iter()
        .filter_map(|child| build_entry(index, child))
        .collect();
    children.sort_by(|a, b| {
        let rank = |e: &VaultTreeEntry| e.kind != NodeKind::Folder;
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    Some(VaultTreeEntry {
        name: node.name.clone(),
        kind: node.kind,
        children,
    })
}
