//! Protocol and engine error types.
//!
//! Every variant here is fatal to the session: the engine reports it through
//! `EngineEvent::Error` and transitions to `Terminated`. Orchestrator-level
//! failures (offset discipline, path traversal, timeouts) surface as
//! `anyhow::Error` from the sync entry points instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Frame header declared a length of zero or above the 10 MiB cap.
    #[error("invalid frame length {0}")]
    InvalidFrameLength(u64),

    /// A frame payload failed structural decoding.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// AEAD tag verification failed; the frame is not delivered.
    #[error("frame authentication failed")]
    AuthenticationFailed,

    /// A directional sequence counter reached its maximum.
    #[error("AEAD sequence counter exhausted")]
    SequenceExhausted,

    /// Peer Hello carried an unsupported protocol version.
    #[error("protocol version mismatch: peer sent {0:?}")]
    VersionMismatch(String),

    /// Unknown message tag, or a message arrived in a state that forbids it.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The local user declined the short authentication string.
    #[error("session rejected: SAS declined locally")]
    SasRejected,

    /// The peer reported a declined short authentication string.
    #[error("session rejected: SAS declined by peer")]
    PeerRejectedSas,

    /// Peer public key was not a P-256 SubjectPublicKeyInfo.
    #[error("peer key is not on curve P-256")]
    CurveMismatch,

    /// Key generation, export, or derivation plumbing failed.
    #[error("key exchange failed: {0}")]
    KeyExchange(String),
}

impl EngineError {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        EngineError::MalformedFrame(what.into())
    }

    pub(crate) fn violation(what: impl Into<String>) -> Self {
        EngineError::ProtocolViolation(what.into())
    }
}
