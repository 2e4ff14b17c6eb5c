//! Error taxonomy for document access.

use std::io;
use std::path::{Path, PathBuf};

use protocol::ErrorKind;
use thiserror::Error;

/// Errors that can occur while resolving, listing or opening documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The requested path escapes the documents root or is malformed.
    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    /// The requested document does not exist or vanished mid-request.
    #[error("document not found: {0}")]
    NotFound(String),

    /// A directory could not be enumerated.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DocumentError {
    /// Classify an IO error raised while touching `path`.
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.display().to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    /// Client-visible classification.
    ///
    /// Permission problems are reported as internal errors: clients only ever
    /// ask for files, and the lister and tree builder swallow directory
    /// enumeration failures before they get here.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathTraversal(_) => ErrorKind::PathTraversal,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }
}
