//! Recursive document tree.
//!
//! The walk is depth-first. Each directory's subfolders are recursed into
//! before its files are appended, then the children are re-sorted (folders
//! first, ordinal by name). A directory that cannot be enumerated is left out
//! of the tree and the walk carries on with its siblings.
//!
//! Symlinked directories are followed only when their target stays inside the
//! root and is not one of the directories currently being walked, so a link
//! back to an ancestor cannot recurse forever. The depth bound is a second
//! guard against pathological trees.

use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use protocol::{join_relative, TreeNode};
use tracing::{debug, warn};

use super::error::DocumentError;
use super::listing::to_utc;

/// Default number of directory levels enumerated below the root.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A subdirectory found while enumerating a directory.
struct FolderCandidate {
    name: String,
    /// Canonical path of the directory (the target, for symlinks).
    canonical: PathBuf,
    metadata: Metadata,
}

/// Builds a [`TreeNode`] mirror of the documents root.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root: PathBuf,
    max_depth: usize,
}

impl TreeBuilder {
    /// Create a builder for `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            root: fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how many directory levels are enumerated. Folders below the
    /// limit appear without children.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Walk the root and return the synthetic "Documents" node.
    pub fn build(&self) -> TreeNode {
        let modified = fs::metadata(&self.root).and_then(|m| m.modified()).ok();
        let mut root = TreeNode::root(to_utc(modified));

        if self.max_depth == 0 {
            return root;
        }

        let mut ancestors = HashSet::new();
        ancestors.insert(self.root.clone());

        match self.walk(&self.root, "", 0, &mut ancestors) {
            Ok(children) => root.children = children,
            Err(e) => warn!("Failed to enumerate documents root {:?}: {}", self.root, e),
        }

        root
    }

    /// Enumerate `dir` and return its sorted children.
    fn walk(
        &self,
        dir: &Path,
        relative: &str,
        depth: usize,
        ancestors: &mut HashSet<PathBuf>,
    ) -> Result<Vec<TreeNode>, DocumentError> {
        let entries = fs::read_dir(dir).map_err(|e| DocumentError::from_io(e, dir))?;

        let mut folders = Vec::new();
        let mut files = Vec::new();

        for entry_result in entries {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!("Skipping non UTF-8 name {:?} in {:?}", raw, dir);
                    continue;
                }
            };

            let Some((canonical, metadata)) = self.inspect(&entry.path()) else {
                continue;
            };

            if metadata.is_dir() {
                folders.push(FolderCandidate {
                    name,
                    canonical,
                    metadata,
                });
            } else if metadata.is_file() {
                let path = join_relative(relative, &name);
                files.push(TreeNode::file(
                    name,
                    path,
                    metadata.len(),
                    to_utc(metadata.modified().ok()),
                ));
            }
        }

        let mut children = Vec::with_capacity(folders.len() + files.len());

        for folder in folders {
            let path = join_relative(relative, &folder.name);
            let mut node = TreeNode::folder(
                &folder.name,
                &path,
                to_utc(folder.metadata.modified().ok()),
            );

            if ancestors.contains(&folder.canonical) {
                debug!("Skipping directory cycle at {}", path);
                continue;
            }

            if depth + 1 >= self.max_depth {
                debug!("Depth limit reached at {}", path);
                children.push(node);
                continue;
            }

            ancestors.insert(folder.canonical.clone());

            match self.walk(&folder.canonical, &path, depth + 1, ancestors) {
                Ok(grandchildren) => {
                    node.children = grandchildren;
                    children.push(node);
                }
                Err(e) => warn!("Skipping directory {}: {}", path, e),
            }

            ancestors.remove(&folder.canonical);
        }

        children.extend(files);
        children.sort_by(TreeNode::sibling_order);
        Ok(children)
    }

    /// Canonical path and metadata for an entry, following symlinks that stay
    /// inside the root. Returns `None` for entries that must not appear.
    fn inspect(&self, path: &Path) -> Option<(PathBuf, Metadata)> {
        let link_metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping {:?}: {}", path, e);
                return None;
            }
        };

        if !link_metadata.file_type().is_symlink() {
            return Some((path.to_path_buf(), link_metadata));
        }

        let target = match fs::canonicalize(path) {
            Ok(t) => t,
            Err(e) => {
                debug!("Skipping dangling symlink {:?}: {}", path, e);
                return None;
            }
        };
        if !target.starts_with(&self.root) {
            debug!("Skipping symlink {:?} pointing outside the root", path);
            return None;
        }

        match fs::metadata(&target) {
            Ok(metadata) => Some((target, metadata)),
            Err(e) => {
                debug!("Skipping symlink {:?}: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    fn names(node: &TreeNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    fn assert_path_invariants(node: &TreeNode) {
        for child in &node.children {
            assert_eq!(child.path, join_relative(&node.path, &child.name));
            assert!(!child.path.split('/').any(|segment| segment == ".."));
            if !child.is_folder {
                assert!(child.children.is_empty());
            } else {
                assert_eq!(child.size, 0);
            }
            assert_path_invariants(child);
        }
    }

    #[test]
    fn test_empty_root() {
        let temp_dir = TempDir::new().unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).build();

        assert_eq!(tree.name, "Documents");
        assert_eq!(tree.path, "");
        assert!(tree.is_folder);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_missing_root_yields_bare_root_node() {
        let temp_dir = TempDir::new().unwrap();

        let tree = TreeBuilder::new(temp_dir.path().join("gone")).build();

        assert_eq!(tree.path, "");
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_folders_first_then_ordinal_names() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir_all(temp_dir.path().join("A")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).build();

        assert_eq!(names(&tree), vec!["A", "a.txt", "b.txt"]);
        assert!(tree.children[0].is_folder);
    }

    #[test]
    fn test_nested_structure_and_paths() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub/dir")).unwrap();
        fs::create_dir_all(temp_dir.path().join("empty")).unwrap();
        fs::write(temp_dir.path().join("sub/dir/report.pdf"), "12345").unwrap();
        fs::write(temp_dir.path().join("sub/notes.txt"), "n").unwrap();
        fs::write(temp_dir.path().join("top.txt"), "t").unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).build();

        assert_eq!(names(&tree), vec!["empty", "sub", "top.txt"]);
        assert_path_invariants(&tree);

        let report = tree.find("sub/dir/report.pdf").unwrap();
        assert_eq!(report.name, "report.pdf");
        assert_eq!(report.size, 5);
        assert_eq!(report.file_type, ".pdf");
        assert!(!report.is_folder);

        let sub = tree.find("sub").unwrap();
        assert_eq!(names(sub), vec!["dir", "notes.txt"]);
        assert!(tree.find("empty").unwrap().children.is_empty());
    }

    #[test]
    fn test_no_extension_filtering() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("script.sh"), "#!/bin/sh").unwrap();
        fs::write(temp_dir.path().join("Makefile"), "all:").unwrap();
        fs::write(temp_dir.path().join(".hidden"), "h").unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).build();

        assert_eq!(names(&tree), vec![".hidden", "Makefile", "script.sh"]);
    }

    #[test]
    fn test_permission_denied_directory_omitted() {
        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("secret.txt"), "secret").unwrap();
        fs::create_dir_all(temp_dir.path().join("open")).unwrap();
        fs::write(temp_dir.path().join("open/visible.txt"), "v").unwrap();
        fs::write(temp_dir.path().join("sibling.txt"), "s").unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running with privileges that ignore permission bits
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let tree = TreeBuilder::new(temp_dir.path()).build();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(names(&tree), vec!["open", "sibling.txt"]);
        assert!(tree.find("open/visible.txt").is_some());
        assert!(tree.find("locked").is_none());
    }

    #[test]
    fn test_symlink_cycle_terminates() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        fs::write(temp_dir.path().join("a/b/file.txt"), "f").unwrap();
        symlink(temp_dir.path(), temp_dir.path().join("a/b/to_root")).unwrap();
        symlink(temp_dir.path().join("a"), temp_dir.path().join("a/to_self")).unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).build();

        assert!(tree.find("a/b/file.txt").is_some());
        assert!(tree.find("a/b/to_root").is_none());
        assert!(tree.find("a/to_self").is_none());
        assert_path_invariants(&tree);
    }

    #[test]
    fn test_symlink_inside_root_followed() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("real")).unwrap();
        fs::write(temp_dir.path().join("real/doc.txt"), "doc").unwrap();
        symlink(temp_dir.path().join("real"), temp_dir.path().join("alias")).unwrap();
        symlink(
            temp_dir.path().join("real/doc.txt"),
            temp_dir.path().join("doc_link.txt"),
        )
        .unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).build();

        assert!(tree.find("alias/doc.txt").is_some());
        assert!(tree.find("real/doc.txt").is_some());
        assert_eq!(tree.find("doc_link.txt").map(|n| n.size), Some(3));
    }

    #[test]
    fn test_symlink_outside_root_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("docs");
        let outside = temp_dir.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), "secret").unwrap();
        symlink(&outside, root.join("escape")).unwrap();
        symlink(outside.join("secret.txt"), root.join("secret.txt")).unwrap();
        symlink(root.join("missing"), root.join("dangling")).unwrap();
        fs::write(root.join("kept.txt"), "k").unwrap();

        let tree = TreeBuilder::new(&root).build();

        assert_eq!(names(&tree), vec!["kept.txt"]);
    }

    #[test]
    fn test_depth_limit() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("l1/l2/l3")).unwrap();
        fs::write(temp_dir.path().join("l1/l2/l3/deep.txt"), "d").unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).with_max_depth(2).build();

        let l2 = tree.find("l1/l2").unwrap();
        assert!(l2.is_folder);
        assert!(l2.children.is_empty());
        assert!(tree.find("l1/l2/l3").is_none());

        let unbounded = TreeBuilder::new(temp_dir.path()).build();
        assert!(unbounded.find("l1/l2/l3/deep.txt").is_some());
    }

    #[test]
    fn test_cycle_at_depth_limit_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a")).unwrap();
        fs::write(temp_dir.path().join("a/file.txt"), "f").unwrap();
        symlink(temp_dir.path(), temp_dir.path().join("a/to_root")).unwrap();
        fs::create_dir_all(temp_dir.path().join("a/plain")).unwrap();

        // Children of "a" sit exactly at the depth limit
        let tree = TreeBuilder::new(temp_dir.path()).with_max_depth(2).build();

        assert!(tree.find("a/to_root").is_none());
        assert!(tree.find("a/file.txt").is_some());
        let plain = tree.find("a/plain").unwrap();
        assert!(plain.children.is_empty());
    }

    #[test]
    fn test_zero_depth_returns_bare_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

        let tree = TreeBuilder::new(temp_dir.path()).with_max_depth(0).build();
        assert!(tree.children.is_empty());
    }
}
