//! Engine and sync configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Which end of the session this engine plays. The role decides salt
/// ordering and directional key assignment during the handshake; it does not
/// restrict which side may speak first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Initiator: calls `start_connection` and sends the first Hello.
    Client,
    /// Responder: waits for the peer's Hello.
    Server,
}

impl Role {
    pub fn is_server(&self) -> bool {
        matches!(self, Role::Server)
    }
}

/// Per-connection engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub role: Role,
    /// Human-readable name advertised in the Hello frame.
    pub device_name: String,
}

impl EngineConfig {
    pub fn new(role: Role, device_name: impl Into<String>) -> Self {
        Self {
            role,
            device_name: device_name.into(),
        }
    }
}

/// Sync orchestrator configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Local root directory; every path on the wire resolves inside it.
    pub root: PathBuf,
    /// Chunk size for outgoing file streams.
    pub chunk_size: usize,
    /// How long to wait for the remote manifest before giving up.
    pub tree_timeout: Duration,
}

impl SyncConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: 64 * 1024,
            tree_timeout: Duration::from_secs(30),
        }
    }
}
