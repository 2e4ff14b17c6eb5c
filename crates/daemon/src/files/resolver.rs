//! Path resolution and containment.
//!
//! Every document request carries an untrusted, possibly percent-encoded
//! relative path. [`PathResolver`] turns it into a [`ResolvedPath`], the only
//! value the rest of the daemon will open or stat. Resolution happens in a
//! fixed order:
//!
//! 1. percent-decode exactly once
//! 2. reject NUL bytes, absolute paths and `..` segments lexically
//! 3. join onto the root, canonicalize, and check containment component-wise
//! 4. for file callers, require a regular file

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::error::DocumentError;

/// An absolute path verified to lie inside the documents root.
///
/// Only [`PathResolver`] can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Canonical absolute path.
    absolute: PathBuf,
    /// Normalized root-relative form, `/` separated. Empty for the root.
    relative: String,
}

impl ResolvedPath {
    /// Canonical absolute path on disk.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Root-relative path as requested, normalized to `/` separators.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Last segment of the requested path, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.relative.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

/// Resolves untrusted relative paths against a fixed documents root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    /// Canonical root directory.
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for `root`. The directory must already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, DocumentError> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).map_err(|e| DocumentError::from_io(e, root))?;
        Ok(Self { root: canonical })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `raw` to an existing path inside the root (file or directory).
    pub fn resolve(&self, raw: &str) -> Result<ResolvedPath, DocumentError> {
        let decoded = decode_path(raw)?;
        let segments = split_segments(&decoded)?;
        let relative = segments.join("/");

        let candidate = segments
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment));

        // Follows symlinks, so a link pointing outside the root is caught below
        let canonical = match fs::canonicalize(&candidate) {
            Ok(canonical) => canonical,
            Err(e) if is_missing(&e) => {
                // A missing target behind an escaping link answers like an
                // existing one, so nothing outside the root can be probed
                if self.escapes_through_ancestor(&candidate) {
                    return Err(DocumentError::PathTraversal(format!(
                        "{} resolves outside the documents root",
                        relative
                    )));
                }
                return Err(DocumentError::NotFound(relative));
            }
            Err(e) => return Err(DocumentError::from_io(e, &candidate)),
        };

        if !is_within(&self.root, &canonical) {
            return Err(DocumentError::PathTraversal(format!(
                "{} resolves outside the documents root",
                relative
            )));
        }

        Ok(ResolvedPath {
            absolute: canonical,
            relative,
        })
    }

    /// Resolve `raw` to an existing regular file inside the root.
    pub fn resolve_file(&self, raw: &str) -> Result<ResolvedPath, DocumentError> {
        let resolved = self.resolve(raw)?;

        let metadata = fs::metadata(resolved.as_path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DocumentError::NotFound(resolved.relative.clone()),
            _ => DocumentError::from_io(e, resolved.as_path()),
        })?;
        if !metadata.is_file() {
            return Err(DocumentError::NotFound(resolved.relative.clone()));
        }

        Ok(resolved)
    }

    /// Whether the deepest existing ancestor of `candidate` lies outside the root.
    fn escapes_through_ancestor(&self, candidate: &Path) -> bool {
        candidate
            .ancestors()
            .skip(1)
            .take_while(|ancestor| ancestor.starts_with(&self.root))
            .find_map(|ancestor| fs::canonicalize(ancestor).ok())
            .is_some_and(|canonical| !is_within(&self.root, &canonical))
    }
}

/// Errors that mean "no such document" for a client-supplied path: a missing
/// entry, a file used as a directory, or a name the filesystem cannot hold.
fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidFilename
    )
}

/// Percent-decode a request path exactly once.
///
/// A `%` that does not start a valid escape is kept as-is, so plain names like
/// `100%.txt` pass through untouched.
pub fn decode_path(raw: &str) -> Result<Cow<'_, str>, DocumentError> {
    urlencoding::decode(raw)
        .map_err(|_| DocumentError::PathTraversal("path is not valid UTF-8".to_string()))
}

/// Split a decoded path into plain name segments.
///
/// Both `/` and `\` separate segments. Empty and `.` segments are dropped.
fn split_segments(decoded: &str) -> Result<Vec<&str>, DocumentError> {
    if decoded.contains('\0') {
        return Err(DocumentError::PathTraversal(
            "path contains a NUL byte".to_string(),
        ));
    }
    if decoded.starts_with(['/', '\\']) {
        return Err(DocumentError::PathTraversal(format!(
            "absolute path not allowed: {}",
            decoded
        )));
    }

    let mut segments = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(DocumentError::PathTraversal(format!(
                    "parent segment in path: {}",
                    decoded
                )));
            }
            _ => {}
        }

        // Catches drive and UNC prefixes on Windows
        let plain = Path::new(segment)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(DocumentError::PathTraversal(format!(
                "invalid path segment: {}",
                segment
            )));
        }

        segments.push(segment);
    }

    Ok(segments)
}

/// Component-wise containment: `/docsXYZ` is not within `/docs`.
fn is_within(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}
