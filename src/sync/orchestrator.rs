//! Sync orchestration over a secured engine.
//!
//! The client runs a server-authoritative one-shot pull: fetch the remote
//! manifest, diff against a local scan, delete what the remote no longer
//! has, then pump the download queue one file at a time. Strict offset
//! ordering keeps the pump trivial; any gap aborts the whole sync.
//!
//! Responder duties (answering manifest and file requests) are registered
//! unconditionally on both endpoints: `serve` runs them alone, `sync` runs
//! them concurrently with the pull.

use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::engine::{EngineEvent, EngineEventReceiver, EngineHandle};
use crate::protocol::FileEntry;
use crate::sync::diff::diff;
use crate::sync::path::{fold_path, validate_path};
use crate::sync::scanner::Scanner;
use crate::sync::temp::TempFileGuard;

/// Counters for one completed sync.
#[derive(Debug, Default, Clone)]
pub struct SyncStats {
    pub files_downloaded: u64,
    pub bytes_downloaded: u64,
    pub files_deleted: u64,
}

/// The single in-flight download. Field order matters: the writer must
/// close before the guard decides the temp file's fate.
struct IncomingTransfer {
    entry: FileEntry,
    final_path: PathBuf,
    expected_offset: u64,
    file: Option<File>,
    guard: Option<TempFileGuard>,
}

pub struct SyncOrchestrator {
    engine: EngineHandle,
    events: EngineEventReceiver,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(engine: EngineHandle, events: EngineEventReceiver, config: SyncConfig) -> Self {
        Self {
            engine,
            events,
            config,
        }
    }

    /// Answer peer requests until the session ends. This is the server
    /// endpoint's steady state.
    pub async fn serve(&mut self) -> Result<()> {
        while let Some(event) = self.events.recv().await {
            match event {
                EngineEvent::Error(msg) => anyhow::bail!("session failed: {msg}"),
                other => self.handle_responder_event(other),
            }
        }
        Ok(())
    }

    /// Run one server-authoritative pull.
    pub async fn sync(&mut self) -> Result<SyncStats> {
        self.engine.request_remote_tree();
        let remote = self.await_remote_tree().await?;

        let scan_root = self.config.root.clone();
        let local = tokio::task::spawn_blocking(move || Scanner::new(scan_root).scan())
            .await
            .context("local scan task failed")??;

        let plan = diff(&local, &remote);
        info!(
            downloads = plan.to_download.len(),
            deletes = plan.to_delete.len(),
            "sync plan computed"
        );

        let mut stats = SyncStats::default();

        for relative in &plan.to_delete {
            let full = validate_path(&self.config.root, relative)?;
            match fs::remove_file(&full).await {
                Ok(()) => {
                    debug!(path = %relative, "deleted");
                    stats.files_deleted += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to delete {relative}"));
                }
            }
        }

        let mut queue: VecDeque<FileEntry> = plan.to_download.into();
        let total = queue.len();
        let mut active = match queue.pop_front() {
            Some(entry) => Some(self.begin_download(entry).await?),
            None => None,
        };

        while let Some(mut transfer) = active.take() {
            self.pump_one(&mut transfer, &mut stats).await?;
            info!(
                path = %transfer.entry.relative_path,
                done = stats.files_downloaded,
                total = total,
                "file complete"
            );
            active = match queue.pop_front() {
                Some(entry) => Some(self.begin_download(entry).await?),
                None => None,
            };
        }

        Ok(stats)
    }

    async fn await_remote_tree(&mut self) -> Result<Vec<FileEntry>> {
        let deadline = Instant::now() + self.config.tree_timeout;
        loop {
            let event = timeout_at(deadline, self.events.recv())
                .await
                .context("timed out waiting for remote manifest")?
                .context("session closed before remote manifest arrived")?;
            match event {
                EngineEvent::RemoteTreeReceived(files) => return Ok(files),
                EngineEvent::Error(msg) => anyhow::bail!("session failed: {msg}"),
                other => self.handle_responder_event(other),
            }
        }
    }

    /// Drive one file until its FileComplete arrives.
    async fn pump_one(&mut self, transfer: &mut IncomingTransfer, stats: &mut SyncStats) -> Result<()> {
        loop {
            let event = self
                .events
                .recv()
                .await
                .context("session closed mid-transfer")?;

            match event {
                EngineEvent::FileChunkReceived { path, offset, data } => {
                    if fold_path(&path) != fold_path(&transfer.entry.relative_path) {
                        debug!(path = %path, "stray chunk ignored");
                        continue;
                    }
                    if offset != transfer.expected_offset {
                        anyhow::bail!(
                            "offset mismatch for {}: got {offset}, expected {}",
                            transfer.entry.relative_path,
                            transfer.expected_offset
                        );
                    }
                    let file = transfer
                        .file
                        .as_mut()
                        .context("transfer writer already closed")?;
                    file.write_all(&data).await.with_context(|| {
                        format!("write failed for {}", transfer.entry.relative_path)
                    })?;
                    transfer.expected_offset += data.len() as u64;
                    stats.bytes_downloaded += data.len() as u64;
                    debug!(
                        path = %transfer.entry.relative_path,
                        bytes = transfer.expected_offset,
                        "chunk written"
                    );
                }
                EngineEvent::FileCompleteReceived(path) => {
                    if fold_path(&path) != fold_path(&transfer.entry.relative_path) {
                        debug!(path = %path, "stray completion ignored");
                        continue;
                    }
                    self.finish_download(transfer).await?;
                    stats.files_downloaded += 1;
                    return Ok(());
                }
                EngineEvent::Error(msg) => anyhow::bail!("session failed: {msg}"),
                other => self.handle_responder_event(other),
            }
        }
    }

    async fn begin_download(&mut self, entry: FileEntry) -> Result<IncomingTransfer> {
        let final_path = validate_path(&self.config.root, &entry.relative_path)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("mkdir failed for {}", parent.display()))?;
        }

        let temp_path = temp_path_for(&final_path);
        // A stale temp from an earlier crash would defeat the exclusive open.
        let _ = fs::remove_file(&temp_path).await;
        let guard = TempFileGuard::new(&temp_path);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("failed to open {}", temp_path.display()))?;

        debug!(path = %entry.relative_path, size = entry.size, "download started");
        self.engine.request_file(&entry.relative_path);

        Ok(IncomingTransfer {
            entry,
            final_path,
            expected_offset: 0,
            file: Some(file),
            guard: Some(guard),
        })
    }

    async fn finish_download(&mut self, transfer: &mut IncomingTransfer) -> Result<()> {
        if let Some(mut file) = transfer.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        match fs::remove_file(&transfer.final_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to replace {}", transfer.final_path.display())
                });
            }
        }

        let guard = transfer
            .guard
            .take()
            .context("transfer guard already consumed")?;
        fs::rename(guard.path(), &transfer.final_path)
            .await
            .with_context(|| format!("rename failed for {}", transfer.final_path.display()))?;
        guard.defuse();

        // Restore the manifest mtime; diff equality is (size, ticks).
        let ticks = transfer.entry.last_write_ticks;
        let mtime = filetime::FileTime::from_unix_time(
            ticks.div_euclid(1_000_000_000),
            ticks.rem_euclid(1_000_000_000) as u32,
        );
        let final_path = transfer.final_path.clone();
        let set_result =
            tokio::task::spawn_blocking(move || filetime::set_file_mtime(&final_path, mtime))
                .await
                .context("mtime task failed")?;
        if let Err(e) = set_result {
            warn!(
                path = %transfer.final_path.display(),
                error = %e,
                "failed to restore mtime"
            );
        }

        Ok(())
    }

    /// Symmetric responder hooks; active on both endpoints.
    fn handle_responder_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::RemoteTreeRequested => {
                let engine = self.engine.clone();
                let root = self.config.root.clone();
                tokio::spawn(async move {
                    match tokio::task::spawn_blocking(move || Scanner::new(root).scan()).await {
                        Ok(Ok(entries)) => engine.send_file_tree(entries),
                        Ok(Err(e)) => warn!(error = %e, "manifest scan failed"),
                        Err(e) => warn!(error = %e, "manifest scan task failed"),
                    }
                });
            }
            EngineEvent::FileRequested(relative) => {
                let engine = self.engine.clone();
                let root = self.config.root.clone();
                let chunk_size = self.config.chunk_size;
                tokio::spawn(async move {
                    if let Err(e) = stream_file(&engine, &root, chunk_size, &relative).await {
                        warn!(path = %relative, error = %e, "file streaming failed");
                    }
                });
            }
            EngineEvent::FileChunkReceived { path, .. } => {
                debug!(path = %path, "chunk with no active transfer ignored");
            }
            EngineEvent::FileCompleteReceived(path) => {
                debug!(path = %path, "completion with no active transfer ignored");
            }
            other => {
                debug!(event = ?other, "unhandled engine event");
            }
        }
    }
}

fn temp_path_for(final_path: &std::path::Path) -> PathBuf {
    let mut os = final_path.to_path_buf().into_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Stream one requested file in order, off the engine's consumer task.
/// Every chunk except the last is exactly `chunk_size` bytes, so offsets
/// advance in fixed steps.
async fn stream_file(
    engine: &EngineHandle,
    root: &std::path::Path,
    chunk_size: usize,
    relative: &str,
) -> Result<()> {
    let full = validate_path(root, relative)?;
    let mut file = File::open(&full)
        .await
        .with_context(|| format!("failed to open {relative}"))?;
    let mut offset = 0u64;
    let mut buf = vec![0u8; chunk_size];

    loop {
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }

        engine.send_file_chunk(relative, offset, Bytes::copy_from_slice(&buf[..filled]));
        offset += filled as u64;

        if filled < buf.len() {
            break;
        }
    }

    engine.send_file_complete(relative);
    debug!(path = %relative, bytes = offset, "file streamed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_appends_suffix() {
        let temp = temp_path_for(std::path::Path::new("/root/dir/video.mp4"));
        assert_eq!(temp, PathBuf::from("/root/dir/video.mp4.tmp"));
    }
}
