//! Commands drained by the engine's consumer task.

use bytes::Bytes;

use crate::protocol::FileEntry;
use crate::transport::TransportEvent;

/// Everything that can mutate engine state goes through this queue: public
/// operations from application callers and events from the transport.
#[derive(Debug)]
pub(crate) enum Command {
    /// Begin connecting; valid only in `Idle`, otherwise ignored.
    StartConnection,
    /// Local verdict on the displayed short authentication string.
    ConfirmSas(bool),
    /// Ask the peer for its file manifest.
    RequestTree,
    /// Answer a manifest request.
    SendTree(Vec<FileEntry>),
    /// Ask the peer to stream a file.
    RequestFile(String),
    /// Stream one chunk of an outgoing file.
    SendFileChunk {
        path: String,
        offset: u64,
        data: Bytes,
    },
    /// Mark an outgoing file as fully streamed.
    SendFileComplete(String),
    /// Connected / inbound bytes / disconnected, in transport order.
    Transport(TransportEvent),
}
