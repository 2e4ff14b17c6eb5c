//! Request-level document operations.
//!
//! [`DocumentService`] bundles the resolver, lister, tree builder and stream
//! provider behind the four operations the HTTP layer needs. Every call
//! re-reads the filesystem; nothing is cached between requests.

use std::io;
use std::path::Path;

use protocol::{DocumentEntry, TreeNode};
use tokio::task;

use super::content_type::{content_type, DocumentKind};
use super::error::DocumentError;
use super::listing::DocumentLister;
use super::resolver::{decode_path, PathResolver, ResolvedPath};
use super::stream::{open_for_read, DocumentStream, TextPreview};
use super::tree::TreeBuilder;

/// Default limit for buffering a text preview (10MB).
pub const DEFAULT_MAX_TEXT_PREVIEW_BYTES: u64 = 10 * 1024 * 1024;

/// A document opened for download.
#[derive(Debug)]
pub struct OpenDocument {
    /// Base name used for `Content-Disposition`.
    pub file_name: String,
    /// MIME type.
    pub content_type: &'static str,
    /// Open stream.
    pub stream: DocumentStream,
}

/// Result of a preview request.
#[derive(Debug)]
pub enum Preview {
    /// Small text file, decoded.
    Text(TextPreview),
    /// Anything else, streamed like a download.
    Stream(OpenDocument),
}

/// Document operations over a single root.
#[derive(Debug, Clone)]
pub struct DocumentService {
    resolver: PathResolver,
    lister: DocumentLister,
    tree: TreeBuilder,
    max_text_preview_bytes: u64,
}

impl DocumentService {
    /// Create a service for an existing `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, DocumentError> {
        let resolver = PathResolver::new(root)?;
        let root = resolver.root().to_path_buf();

        Ok(Self {
            lister: DocumentLister::new(&root),
            tree: TreeBuilder::new(&root),
            resolver,
            max_text_preview_bytes: DEFAULT_MAX_TEXT_PREVIEW_BYTES,
        })
    }

    /// Limit tree depth.
    pub fn with_max_tree_depth(mut self, max_depth: usize) -> Self {
        self.tree = self.tree.with_max_depth(max_depth);
        self
    }

    /// Limit how much of a text file preview buffers in memory.
    pub fn with_max_text_preview_bytes(mut self, limit: u64) -> Self {
        self.max_text_preview_bytes = limit;
        self
    }

    /// Canonical documents root.
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Flat listing of top-level documents. Blocking.
    pub fn list(&self) -> Vec<DocumentEntry> {
        self.lister.list()
    }

    /// Full document tree. Blocking.
    pub fn tree(&self) -> TreeNode {
        self.tree.build()
    }

    /// Resolve a raw, possibly percent-encoded, relative path to a file. Blocking.
    pub fn resolve_file(&self, raw: &str) -> Result<ResolvedPath, DocumentError> {
        self.resolver.resolve_file(raw)
    }

    /// Resolve and open a document for download.
    pub async fn open(&self, raw: &str) -> Result<OpenDocument, DocumentError> {
        let resolver = self.resolver.clone();
        let raw = raw.to_string();
        let resolved = task::spawn_blocking(move || resolver.resolve_file(&raw))
            .await
            .map_err(|e| DocumentError::Io(io::Error::other(e)))??;

        let file_name = resolved
            .file_name()
            .map(str::to_string)
            .unwrap_or_default();
        let stream = open_for_read(&resolved).await?;

        Ok(OpenDocument {
            content_type: content_type(&file_name),
            file_name,
            stream,
        })
    }

    /// Open a single top-level document for preview.
    ///
    /// Text files up to the preview limit are decoded in memory; larger text
    /// files and every other type come back as a stream.
    pub async fn preview(&self, raw_name: &str) -> Result<Preview, DocumentError> {
        let decoded = decode_path(raw_name)?;
        if decoded.contains(['/', '\\']) {
            return Err(DocumentError::PathTraversal(format!(
                "preview takes a single file name: {}",
                decoded
            )));
        }

        let document = self.open(raw_name).await?;
        let is_text = DocumentKind::from_file_name(&document.file_name)
            .is_some_and(|kind| kind.is_text());

        if is_text && document.stream.len() <= self.max_text_preview_bytes {
            let preview = document
                .stream
                .read_text(self.max_text_preview_bytes)
                .await?;
            return Ok(Preview::Text(preview));
        }

        Ok(Preview::Stream(document))
    }
}
