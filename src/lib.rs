//! Peer-to-peer secure file synchronization for trusted local networks.
//!
//! Two endpoints - a client (initiator) and a server (responder) - negotiate
//! an ephemeral P-256 session over any byte-stream transport, verify it with
//! a four-emoji short authentication string, and then exchange manifests and
//! file contents over AEAD-protected frames.
//!
//! # Architecture
//!
//! ```text
//! application        orchestrator (pull pump / responder hooks)
//!      |                   |  commands            ^  events
//!      v                   v                      |
//!   EngineHandle ----> engine actor (single consumer, state machine,
//!      ^               frame codec, key schedule, AEAD cutover)
//!      |                   |  send                 ^  bytes
//!      |                   v                       |
//!      +---------------- transport (TCP or in-process loopback)
//! ```
//!
//! The engine is an actor: all state transitions and all crypto run on one
//! consumer task draining an unbounded command queue. Security rests on the
//! human comparing the SAS out of band - never auto-accept it outside tests.

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod sync;
pub mod transport;

pub use config::{EngineConfig, Role, SyncConfig};
pub use engine::{spawn_engine, EngineEvent, EngineEventReceiver, EngineHandle, EngineState};
pub use error::EngineError;
pub use protocol::{FileEntry, Frame, FrameCodec, MessageType};
pub use sync::{diff, Scanner, SyncOrchestrator, SyncPlan, SyncStats};
pub use transport::{LoopbackTransport, TcpTransport, Transport, TransportEvent};
