//! Application-facing engine events.

use bytes::Bytes;

use crate::protocol::FileEntry;

/// Emitted by the engine's consumer task, in the exact order the frames that
/// caused them arrived.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The handshake derived a short authentication string; show it to the
    /// user and call `confirm_sas` with their verdict.
    SasGenerated([&'static str; 4]),
    /// The peer's AuthVerify authenticated; application traffic may flow.
    SessionSecured,
    /// Fatal failure; the engine has terminated.
    Error(String),
    /// Peer asked for our manifest.
    RemoteTreeRequested,
    /// Peer's manifest arrived.
    RemoteTreeReceived(Vec<FileEntry>),
    /// Peer asked us to stream a file.
    FileRequested(String),
    /// One chunk of an incoming file.
    FileChunkReceived {
        path: String,
        offset: u64,
        data: Bytes,
    },
    /// An incoming file finished streaming.
    FileCompleteReceived(String),
}
