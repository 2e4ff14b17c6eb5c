//! # DocShelf Protocol Library
//!
//! Wire models exchanged between the DocShelf daemon and its HTTP clients.
//!
//! ## Overview
//!
//! - **Documents**: flat [`DocumentEntry`] listings and the nested [`TreeNode`]
//!   folder tree, serialized as camelCase JSON
//! - **Errors**: the [`ErrorKind`] classification and the [`ErrorBody`] JSON
//!   shape returned for failed requests
//!
//! Nothing in this crate touches the filesystem; the daemon builds these values
//! from its own directory walks.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{TreeNode, ROOT_NODE_NAME};
//!
//! let mut root = TreeNode::root(chrono::Utc::now());
//! root.children.push(TreeNode::file("notes.txt", "notes.txt", 12, chrono::Utc::now()));
//!
//! assert_eq!(root.name, ROOT_NODE_NAME);
//! let json = serde_json::to_string(&root).unwrap();
//! assert!(json.contains("\"isFolder\":true"));
//! ```
//!
//! ## Modules
//!
//! - [`documents`]: Listing entries and tree nodes
//! - [`error`]: Error kinds and response bodies

pub mod documents;
pub mod error;

pub use documents::{
    file_type_of, join_relative, DocumentEntry, TreeNode, FOLDER_FILE_TYPE, ROOT_NODE_NAME,
};
pub use error::{ErrorBody, ErrorKind};
