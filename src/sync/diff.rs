//! Manifest diffing.
//!
//! Remote is the source of truth: anything the peer has that we lack or
//! that differs in size or modification ticks gets downloaded, anything we
//! have that the peer lacks gets deleted. Purely functional - no I/O,
//! deterministic in its two inputs. Paths compare case-folded.

use std::collections::HashMap;

use crate::protocol::FileEntry;
use crate::sync::path::fold_path;

/// Work list for one sync, computed once from the two manifests.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub to_download: Vec<FileEntry>,
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty() && self.to_delete.is_empty()
    }
}

pub fn diff(local: &[FileEntry], remote: &[FileEntry]) -> SyncPlan {
    let local_by_path: HashMap<String, &FileEntry> = local
        .iter()
        .map(|entry| (fold_path(&entry.relative_path), entry))
        .collect();

    let to_download = remote
        .iter()
        .filter(|remote_entry| {
            match local_by_path.get(&fold_path(&remote_entry.relative_path)) {
                None => true,
                Some(local_entry) => {
                    local_entry.size != remote_entry.size
                        || local_entry.last_write_ticks != remote_entry.last_write_ticks
                }
            }
        })
        .cloned()
        .collect();

    let remote_paths: std::collections::HashSet<String> = remote
        .iter()
        .map(|entry| fold_path(&entry.relative_path))
        .collect();

    let to_delete = local
        .iter()
        .filter(|entry| !remote_paths.contains(&fold_path(&entry.relative_path)))
        .map(|entry| entry.relative_path.clone())
        .collect();

    SyncPlan {
        to_download,
        to_delete,
    }
}
