//! Flat listing of the top-level documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use protocol::{file_type_of, DocumentEntry};
use tracing::{debug, warn};

use super::content_type::is_allowed_extension;

/// Lists the regular files directly under the documents root.
///
/// Listing is best-effort: a root that cannot be read yields an empty list
/// and a warning in the log, never an error.
#[derive(Debug, Clone)]
pub struct DocumentLister {
    root: PathBuf,
}

impl DocumentLister {
    /// Create a lister for `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// List allowed documents under the root, ordered by name.
    pub fn list(&self) -> Vec<DocumentEntry> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list documents in {:?}: {}", self.root, e);
                return Vec::new();
            }
        };

        let mut documents = Vec::new();

        for entry_result in entries {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry in {:?}: {}", self.root, e);
                    continue;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("Skipping non UTF-8 file name {:?}", raw);
                    continue;
                }
            };

            let file_type = file_type_of(&name);
            if !is_allowed_extension(&file_type) {
                continue;
            }

            // Don't follow symlinks
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {:?}: {}", entry.path(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            documents.push(DocumentEntry::new(
                name,
                metadata.len(),
                to_utc(metadata.modified().ok()),
            ));
        }

        documents.sort_by(|a, b| a.name.cmp(&b.name));
        documents
    }
}

/// Convert a filesystem timestamp, falling back to the Unix epoch.
pub(crate) fn to_utc(time: Option<SystemTime>) -> DateTime<Utc> {
    DateTime::<Utc>::from(time.unwrap_or(SystemTime::UNIX_EPOCH))
}
