//! Encrypted vault index.
//!
//! The index is the single source of truth for the note tree: it maps node
//! IDs to real names, parent links, and metadata, and is persisted as one
//! AEAD-sealed JSON document. Blob filenames on disk carry only random
//! node IDs, so without the index and the vault key the directory reveals
//! neither names nor structure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use inkvault_common::{Error, NodeId, Result, VaultId};
use inkvault_crypto::{aead, Container, ContainerHeader, ContentType, Nonce, Salt, VaultKey};
use inkvault_io::atomic_write;

use crate::layout::VaultLayout;

/// Whether a node is a note or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// A single entry in the vault index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexNode {
    pub id: NodeId,
    pub name: String,
    pub parent_id: Option<NodeId>,
    pub kind: NodeKind,
    pub metadata: Map<String, Value>,
}

/// In-memory note tree, held only while a session is unlocked.
///
/// Nodes live in a flat arena keyed by ID; a secondary parent-to-children
/// map is maintained on every mutation so lookups walk children lists
/// instead of scanning the whole arena. Exactly one folder (the root) has
/// no parent.
#[derive(Debug, Clone)]
pub struct VaultIndex {
    vault_id: VaultId,
    nodes: HashMap<NodeId, IndexNode>,
    children: HashMap<NodeId, Vec<NodeId>>,
    root_id: Option<NodeId>,
}

/// On-disk JSON shape of the index document.
#[derive(Serialize, Deserialize)]
struct IndexDoc {
    vault_id: VaultId,
    nodes: BTreeMap<String, WireNode>,
}

#[derive(Serialize, Deserialize)]
struct WireNode {
    name: String,
    parent: Option<String>,
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl VaultIndex {
    /// Create an empty index for a vault.
    pub fn new(vault_id: VaultId) -> Self {
        Self {
            vault_id,
            nodes: HashMap::new(),
            children: HashMap::new(),
            root_id: None,
        }
    }

    pub fn vault_id(&self) -> &VaultId {
        &self.vault_id
    }

    /// Add a node to the index.
    ///
    /// Generates a fresh short ID when `node_id` is `None`. A node without
    /// a parent is the root and must be a folder; at most one root exists.
    /// Sibling names are unique, which keeps path lookups deterministic.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] for an invalid name, a second root, or a
    ///   non-folder root
    /// - [`Error::DuplicateId`] if an explicit ID is already taken
    /// - [`Error::ParentNotFound`] / [`Error::ParentNotFolder`]
    /// - [`Error::DuplicateName`] if the parent already has a child with
    ///   this name
    pub fn add_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent_id: Option<&NodeId>,
        node_id: Option<NodeId>,
    ) -> Result<NodeId> {
        validate_name(name)?;

        let id = node_id.unwrap_or_else(NodeId::generate);
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }

        match parent_id {
            Some(parent) => {
                let parent_node = self
                    .nodes
                    .get(parent)
                    .ok_or_else(|| Error::ParentNotFound(parent.clone()))?;
                if parent_node.kind != NodeKind::Folder {
                    return Err(Error::ParentNotFolder(parent.clone()));
                }
                if self.child_by_name(parent, name).is_some() {
                    return Err(Error::DuplicateName {
                        parent: parent.clone(),
                        name: name.to_string(),
                    });
                }
            }
            None => {
                if self.root_id.is_some() {
                    return Err(Error::InvalidInput(
                        "Index already has a root folder".to_string(),
                    ));
                }
                if kind != NodeKind::Folder {
                    return Err(Error::InvalidInput(
                        "Root node must be a folder".to_string(),
                    ));
                }
            }
        }

        let node = IndexNode {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent_id.cloned(),
            kind,
            metadata: Map::new(),
        };

        match parent_id {
            Some(parent) => self
                .children
                .entry(parent.clone())
                .or_default()
                .push(id.clone()),
            None => self.root_id = Some(id.clone()),
        }
        self.nodes.insert(id.clone(), node);

        Ok(id)
    }

    /// Remove a childless node.
    ///
    /// # Errors
    /// - [`Error::NodeNotFound`]
    /// - [`Error::NodeHasChildren`] if anything still references it as a
    ///   parent
    pub fn remove_node(&mut self, node_id: &NodeId) -> Result<()> {
        let parent_id = match self.nodes.get(node_id) {
            Some(node) => node.parent_id.clone(),
            None => return Err(Error::NodeNotFound(node_id.clone())),
        };
        if !self.children(node_id).is_empty() {
            return Err(Error::NodeHasChildren(node_id.clone()));
        }

        self.nodes.remove(node_id);
        self.children.remove(node_id);
        match parent_id {
            Some(parent) => {
                if let Some(siblings) = self.children.get_mut(&parent) {
                    siblings.retain(|id| id != node_id);
                }
            }
            None => self.root_id = None,
        }
        Ok(())
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&IndexNode> {
        self.nodes.get(node_id)
    }

    pub fn root_id(&self) -> Option<&NodeId> {
        self.root_id.as_ref()
    }

    /// IDs of a node's direct children.
    pub fn children(&self, parent_id: &NodeId) -> &[NodeId] {
        self.children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find a direct child by name.
    pub fn child_by_name(&self, parent_id: &NodeId, name: &str) -> Option<&NodeId> {
        self.children
            .get(parent_id)?
            .iter()
            .find(|id| self.nodes.get(*id).is_some_and(|node| node.name == name))
    }

    /// The `/`-joined path of a node, relative to the root.
    ///
    /// The root's own name is not part of any path; the root itself maps
    /// to the empty string.
    ///
    /// # Errors
    /// - [`Error::NodeNotFound`]
    pub fn get_path(&self, node_id: &NodeId) -> Result<String> {
        if !self.nodes.contains_key(node_id) {
            return Err(Error::NodeNotFound(node_id.clone()));
        }

        let mut parts: Vec<&str> = Vec::new();
        let mut current = Some(node_id);
        while let Some(id) = current {
            let node = self.nodes.get(id).ok_or_else(|| {
                Error::CorruptIndex(format!("Dangling parent reference: {id}"))
            })?;
            if node.parent_id.is_some() {
                parts.push(&node.name);
            }
            current = node.parent_id.as_ref();
        }

        parts.reverse();
        Ok(parts.join("/"))
    }

    /// Resolve a `/`-joined relative path to a node ID.
    ///
    /// The empty path resolves to the root. Returns `None` when any
    /// segment is missing.
    pub fn find_by_path(&self, path: &str) -> Option<&NodeId> {
        let root = self.root_id.as_ref()?;
        if path.is_empty() {
            return Some(root);
        }

        let mut current = root;
        for segment in path.split('/') {
            current = self.child_by_name(current, segment)?;
        }
        Some(current)
    }

    /// Iterate over all nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &IndexNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set a metadata entry on a node.
    ///
    /// # Errors
    /// - [`Error::NodeNotFound`]
    pub fn set_metadata(&mut self, node_id: &NodeId, key: &str, value: Value) -> Result<()> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| Error::NodeNotFound(node_id.clone()))?;
        node.metadata.insert(key.to_string(), value);
        Ok(())
    }

    /// Serialize and seal the index under the vault key.
    ///
    /// A fresh random nonce is generated when none is supplied.
    pub fn encrypt_for_storage(
        &self,
        key: &VaultKey,
        nonce: Option<&[u8]>,
    ) -> Result<(Vec<u8>, Nonce)> {
        let plaintext = serde_json::to_vec_pretty(&self.to_doc())
            .map_err(|e| Error::Serialization(format!("Index encoding failed: {}", e)))?;
        aead::encrypt(key.as_bytes(), &plaintext, nonce)
    }

    /// Decrypt, deserialize, and validate an index document.
    ///
    /// The decrypted tree is checked before use: exactly one root folder,
    /// every parent present and a folder, no parent cycles, unique sibling
    /// names. A document that fails any check is rejected rather than
    /// loaded in a half-usable state.
    ///
    /// # Errors
    /// - [`Error::AuthenticationFailure`] on a wrong key or tampering
    /// - [`Error::CorruptIndex`] if the decrypted tree violates invariants
    pub fn decrypt_from_storage(ciphertext: &[u8], key: &VaultKey, nonce: &[u8]) -> Result<Self> {
        let plaintext = aead::decrypt(key.as_bytes(), ciphertext, nonce)?;
        let doc: IndexDoc = serde_json::from_slice(plaintext.as_bytes())
            .map_err(|e| Error::Serialization(format!("Index decoding failed: {}", e)))?;
        Self::from_doc(doc)
    }

    /// Seal the index and atomically write it to the layout's index path.
    pub fn save(&self, layout: &VaultLayout, key: &VaultKey, salt: &Salt) -> Result<()> {
        let (ciphertext, nonce) = self.encrypt_for_storage(key, None)?;
        let header = ContainerHeader::new(
            ContentType::Index,
            self.vault_id.as_str(),
            salt.clone(),
            nonce,
        );
        let data = Container::new(header, ciphertext).encode()?;
        atomic_write(&layout.index_path(), &data)?;

        debug!(nodes = self.nodes.len(), "Index saved");
        Ok(())
    }

    /// Load and decrypt the index from the layout's index path.
    ///
    /// # Errors
    /// - [`Error::VaultNotFound`] if no index file exists
    pub fn load(layout: &VaultLayout, key: &VaultKey) -> Result<Self> {
        let index_path = layout.index_path();
        if !index_path.exists() {
            return Err(Error::VaultNotFound(layout.root().to_path_buf()));
        }

        let data = fs::read(&index_path)?;
        let container = Container::decode(&data)?;
        Self::decrypt_from_storage(
            &container.ciphertext,
            key,
            container.header.nonce.as_bytes(),
        )
    }

    fn to_doc(&self) -> IndexDoc {
        let nodes = self
            .nodes
            .values()
            .map(|node| {
                (
                    node.id.to_string(),
                    WireNode {
                        name: node.name.clone(),
                        parent: node.parent_id.as_ref().map(|p| p.to_string()),
                        kind: node.kind,
                        metadata: node.metadata.clone(),
                    },
                )
            })
            .collect();
        IndexDoc {
            vault_id: self.vault_id.clone(),
            nodes,
        }
    }

    fn from_doc(doc: IndexDoc) -> Result<Self> {
        let mut nodes = HashMap::with_capacity(doc.nodes.len());
        let mut root_id: Option<NodeId> = None;

        for (id_str, wire) in &doc.nodes {
            let id = NodeId::new(id_str.clone())
                .map_err(|_| Error::CorruptIndex(format!("Invalid node ID {id_str:?}")))?;
            validate_name(&wire.name)
                .map_err(|_| Error::CorruptIndex(format!("Invalid name on node {id}")))?;

            let parent_id = match &wire.parent {
                Some(p) => Some(
                    NodeId::new(p.clone())
                        .map_err(|_| Error::CorruptIndex(format!("Invalid parent ID {p:?}")))?,
                ),
                None => None,
            };

            if parent_id.is_none() {
                if wire.kind != NodeKind::Folder {
                    return Err(Error::CorruptIndex(format!(
                        "Root node {id} is not a folder"
                    )));
                }
                if let Some(existing) = &root_id {
                    return Err(Error::CorruptIndex(format!(
                        "Multiple root nodes: {existing} and {id}"
                    )));
                }
                root_id = Some(id.clone());
            }

            nodes.insert(
                id.clone(),
                IndexNode {
                    id,
                    name: wire.name.clone(),
                    parent_id,
                    kind: wire.kind,
                    metadata: wire.metadata.clone(),
                },
            );
        }

        let root_id = root_id.ok_or_else(|| Error::CorruptIndex("No root folder".to_string()))?;

        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent_id) = &node.parent_id {
                let parent = nodes.get(parent_id).ok_or_else(|| {
                    Error::CorruptIndex(format!(
                        "Node {} references missing parent {}",
                        node.id, parent_id
                    ))
                })?;
                if parent.kind != NodeKind::Folder {
                    return Err(Error::CorruptIndex(format!(
                        "Node {} has non-folder parent {}",
                        node.id, parent_id
                    )));
                }
                children
                    .entry(parent_id.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }

        for (parent_id, kids) in &children {
            let mut seen = HashSet::new();
            for kid in kids {
                let name = nodes.get(kid).map(|n| n.name.as_str()).unwrap_or_default();
                if !seen.insert(name) {
                    return Err(Error::CorruptIndex(format!(
                        "Duplicate sibling name {name:?} under {parent_id}"
                    )));
                }
            }
        }

        // Every parent chain must terminate; a chain longer than the node
        // count means a cycle.
        for node in nodes.values() {
            let mut steps = 0usize;
            let mut current = Some(&node.id);
            while let Some(id) = current {
                if steps > nodes.len() {
                    return Err(Error::CorruptIndex(format!(
                        "Parent cycle involving {}",
                        node.id
                    )));
                }
                steps += 1;
                current = nodes.get(id).and_then(|n| n.parent_id.as_ref());
            }
        }

        Ok(Self {
            vault_id: doc.vault_id,
            nodes,
            children,
            root_id: Some(root_id),
        })
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("Node name cannot be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidInput(format!(
            "Node name cannot contain path separators: {name:?}"
        )));
    }
    Ok(())
}
