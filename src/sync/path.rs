//! Traversal-safe path resolution.
//!
//! Every relative path taken from the wire resolves through here before any
//! filesystem handle is opened. Lexical normalization is used instead of
//! `canonicalize` so paths that do not exist yet can still be checked.

use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Resolve `relative` against `root`, rejecting anything that could escape.
pub fn validate_path(root: &Path, relative: &str) -> Result<PathBuf> {
    if relative.is_empty() {
        anyhow::bail!("empty path not allowed");
    }

    let rel_path = Path::new(relative);
    if rel_path.is_absolute() {
        anyhow::bail!("absolute path not allowed: {relative}");
    }

    for component in rel_path.components() {
        match component {
            Component::ParentDir => {
                anyhow::bail!("path traversal not allowed: {relative}");
            }
            Component::Prefix(_) => {
                anyhow::bail!("prefixed path not allowed: {relative}");
            }
            _ => {}
        }
    }

    let full = root.join(rel_path);
    let normalized = normalize_path(&full);
    let root_normalized = normalize_path(root);
    if !normalized.starts_with(&root_normalized) {
        anyhow::bail!("path escapes sync root: {relative}");
    }

    Ok(full)
}

/// Lexically normalize a path without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            c => normalized.push(c),
        }
    }
    normalized
}

/// Case-fold a wire path for comparison. Folding never applies to the path
/// actually opened on disk.
pub fn fold_path(path: &str) -> String {
    path.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_relative_path_ok() {
        let root = Path::new("/data/sync");
        let full = validate_path(root, "folder/file.txt").unwrap();
        assert_eq!(full, PathBuf::from("/data/sync/folder/file.txt"));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(validate_path(Path::new("/data"), "").is_err());
    }

    #[test]
    fn test_absolute_path_rejected() {
        assert!(validate_path(Path::new("/data"), "/etc/passwd").is_err());
    }

    #[test]
    fn test_parent_traversal_rejected() {
        assert!(validate_path(Path::new("/data"), "../outside.txt").is_err());
        assert!(validate_path(Path::new("/data"), "a/../../outside.txt").is_err());
    }

    #[test]
    fn test_fold_path_lowers_case() {
        assert_eq!(fold_path("Folder/File.TXT"), "folder/file.txt");
    }
}
