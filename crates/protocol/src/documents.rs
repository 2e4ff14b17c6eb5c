//! Document listing and folder tree models.
//!
//! Field names follow the camelCase convention used by the HTTP API
//! (`lastModified`, `isFolder`, `fileType`). Timestamps serialize as RFC 3339.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the synthetic node at the top of every tree.
pub const ROOT_NODE_NAME: &str = "Documents";

/// `fileType` reported for folder nodes.
pub const FOLDER_FILE_TYPE: &str = "folder";

/// A single top-level document in the flat listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    /// Base file name.
    pub name: String,
    /// Path relative to the documents root, `/` separated.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Lowercased extension including the dot, or empty.
    pub file_type: String,
}

impl DocumentEntry {
    /// Create an entry for a file directly under the root.
    pub fn new(name: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            file_type: file_type_of(&name),
            name,
            size,
            last_modified,
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Entry name (not full path).
    pub name: String,
    /// Path relative to the documents root, `/` separated. Empty for the root.
    pub path: String,
    /// Whether this node is a folder.
    pub is_folder: bool,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// `"folder"` for folders, otherwise the lowercased dotted extension.
    #[serde(default)]
    pub file_type: String,
    /// Child nodes, folders first. Always empty for files.
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create the synthetic root node.
    pub fn root(last_modified: DateTime<Utc>) -> Self {
        Self::folder(ROOT_NODE_NAME, "", last_modified)
    }

    /// Create a folder node with no children.
    pub fn folder(
        name: impl Into<String>,
        path: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_folder: true,
            size: 0,
            last_modified,
            file_type: FOLDER_FILE_TYPE.to_string(),
            children: Vec::new(),
        }
    }

    /// Create a file (leaf) node.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        Self {
            file_type: file_type_of(&name),
            name,
            path: path.into(),
            is_folder: false,
            size,
            last_modified,
            children: Vec::new(),
        }
    }

    /// Sibling order: folders before files, then ordinal (byte-wise) by name.
    pub fn sibling_order(a: &TreeNode, b: &TreeNode) -> Ordering {
        b.is_folder
            .cmp(&a.is_folder)
            .then_with(|| a.name.cmp(&b.name))
    }

    /// Sort children in place using [`TreeNode::sibling_order`].
    pub fn sort_children(&mut self) {
        self.children.sort_by(Self::sibling_order);
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }

    /// Find a descendant by its root-relative path.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// Lowercased extension of `name` including the leading dot, or empty.
///
/// The extension runs from the last `.` of the base name, so a dot file such
/// as `.pdf` has the extension `.pdf`. A trailing dot means no extension.
pub fn file_type_of(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(dot) if dot + 1 < base.len() => base[dot..].to_lowercase(),
        _ => String::new(),
    }
}

/// Join a root-relative parent path and a child name with `/`.
pub fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
