//! Document access: path resolution, listing, tree building and streaming.
//!
//! This module provides:
//! - Containment-checked resolution of untrusted relative paths
//! - A flat listing of top-level documents
//! - A recursive folder tree
//! - Extension to MIME type mapping
//! - Read-only streams for download and preview
//!
//! # Security
//!
//! Every path a client sends goes through [`PathResolver`]. Parent segments,
//! absolute paths and NUL bytes are rejected before any filesystem call, and
//! the canonicalized result must lie inside the documents root. Only the
//! resulting [`ResolvedPath`] can be opened.

pub mod content_type;
pub mod error;
pub mod listing;
pub mod resolver;
pub mod service;
pub mod stream;
pub mod tree;

pub use content_type::{content_type, DocumentKind, DEFAULT_CONTENT_TYPE};
pub use error::DocumentError;
pub use listing::DocumentLister;
pub use resolver::{PathResolver, ResolvedPath};
pub use service::{DocumentService, OpenDocument, Preview};
pub use stream::{open_for_read, DocumentStream, TextPreview};
pub use tree::TreeBuilder;
