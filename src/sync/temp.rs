//! Temp-file cleanup guard.
//!
//! Downloads land in `<final>.part` first; the guard removes the temp file
//! if the transfer dies before the rename, and is defused right after it.

use std::path::{Path, PathBuf};
use tracing::debug;

pub struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Call after a successful rename; the temp path no longer exists.
    pub fn defuse(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "temp file cleanup failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.part");
        std::fs::write(&path, b"partial").unwrap();

        let guard = TempFileGuard::new(&path);
        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn test_defused_guard_leaves_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.part");
        std::fs::write(&path, b"kept").unwrap();

        let guard = TempFileGuard::new(&path);
        guard.defuse();
        assert!(path.exists());
    }

    #[test]
    fn test_drop_on_missing_file_is_quiet() {
        let tmp = TempDir::new().unwrap();
        let guard = TempFileGuard::new(tmp.path().join("never-created.part"));
        drop(guard);
    }
}
