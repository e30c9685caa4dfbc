//! Local directory scan.
//!
//! Walks the sync root and produces one `FileEntry` per regular file.
//! Symlinks and other non-regular entries are skipped. Relative paths use
//! forward slashes and keep their on-disk case; comparison-time folding
//! happens in the diff.
//!
//! `scan` is blocking; async callers wrap it in `spawn_blocking`.

use anyhow::{Context, Result};
use filetime::FileTime;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::protocol::FileEntry;

pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn scan(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.context("directory walk failed")?;
            if !entry.file_type().is_file() {
                continue;
            }

            let metadata = entry
                .metadata()
                .with_context(|| format!("stat failed for {}", entry.path().display()))?;

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .context("walked entry outside scan root")?;

            entries.push(FileEntry::new(
                wire_path(relative),
                metadata.len(),
                mtime_ticks(&metadata),
            ));
        }

        Ok(entries)
    }
}

/// Forward-slash path for the wire, regardless of host separator.
fn wire_path(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// Modification time as nanoseconds since the Unix epoch.
fn mtime_ticks(metadata: &std::fs::Metadata) -> i64 {
    let mtime = FileTime::from_last_modification_time(metadata);
    mtime.unix_seconds() * 1_000_000_000 + i64::from(mtime.nanoseconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let entries = Scanner::new(tmp.path()).scan().unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_scan_finds_nested_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("top.txt"), "top").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub/inner.bin"), "inner!").unwrap();

        let mut entries = Scanner::new(tmp.path()).scan().unwrap();
        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].relative_path, "sub/inner.bin");
        assert_eq!(entries[0].size, 6);
        assert_eq!(entries[1].relative_path, "top.txt");
        assert_eq!(entries[1].size, 3);
        assert!(entries.iter().all(|e| e.last_write_ticks > 0));
        assert!(entries.iter().all(|e| e.hash.is_none()));
    }

    #[test]
    fn test_scan_preserves_case() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("MixedCase.TXT"), "x").unwrap();

        let entries = Scanner::new(tmp.path()).scan().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "MixedCase.TXT");
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_symlinks() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("real.txt"), "real").unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real.txt"), tmp.path().join("link.txt"))
            .unwrap();

        let entries = Scanner::new(tmp.path()).scan().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].relative_path, "real.txt");
    }
}
