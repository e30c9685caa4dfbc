//! In-process loopback transport.
//!
//! Two endpoints joined by byte FIFOs, satisfying the same contract as the
//! TCP transport. The fragmenting constructor re-chunks every send into
//! random-sized pieces before delivery so codec reassembly gets exercised.
//!
//! Only the initiating side's `connect()` emits `Connected`; the passive
//! side's first signal is the peer's bytes, mirroring an accepted socket
//! whose transport chooses not to announce itself.

use std::sync::Arc;

use bytes::Bytes;
use rand_core::{OsRng, RngCore};
use tokio::sync::mpsc;

use super::{IoCommand, Transport, TransportEvent, TransportEventReceiver, TransportEventSender};

pub struct LoopbackTransport {
    ops: mpsc::UnboundedSender<IoCommand>,
}

type Endpoint = (Arc<LoopbackTransport>, TransportEventReceiver);

impl LoopbackTransport {
    /// Paired endpoints delivering sends verbatim.
    pub fn pair() -> (Endpoint, Endpoint) {
        Self::pair_inner(0)
    }

    /// Paired endpoints that split every send into chunks of
    /// `1..=max_chunk` bytes before delivery.
    pub fn pair_fragmented(max_chunk: usize) -> (Endpoint, Endpoint) {
        assert!(max_chunk > 0, "max_chunk must be at least 1");
        Self::pair_inner(max_chunk)
    }

    fn pair_inner(max_chunk: usize) -> (Endpoint, Endpoint) {
        let (a_to_b_tx, a_to_b_rx) = mpsc::unbounded_channel();
        let (b_to_a_tx, b_to_a_rx) = mpsc::unbounded_channel();

        let a = Self::endpoint(a_to_b_tx, b_to_a_rx, max_chunk);
        let b = Self::endpoint(b_to_a_tx, a_to_b_rx, max_chunk);
        (a, b)
    }

    fn endpoint(
        peer_tx: mpsc::UnboundedSender<Bytes>,
        peer_rx: mpsc::UnboundedReceiver<Bytes>,
        max_chunk: usize,
    ) -> Endpoint {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive(peer_tx, peer_rx, ops_rx, events_tx, max_chunk));

        (Arc::new(Self { ops: ops_tx }), events_rx)
    }
}

impl Transport for LoopbackTransport {
    fn connect(&self) {
        let _ = self.ops.send(IoCommand::Connect);
    }

    fn send(&self, bytes: Bytes) {
        let _ = self.ops.send(IoCommand::Send(bytes));
    }

    fn disconnect(&self) {
        let _ = self.ops.send(IoCommand::Disconnect);
    }
}

async fn drive(
    peer_tx: mpsc::UnboundedSender<Bytes>,
    mut peer_rx: mpsc::UnboundedReceiver<Bytes>,
    mut ops: mpsc::UnboundedReceiver<IoCommand>,
    events: TransportEventSender,
    max_chunk: usize,
) {
    loop {
        tokio::select! {
            op = ops.recv() => match op {
                Some(IoCommand::Connect) => {
                    let _ = events.send(TransportEvent::Connected);
                }
                Some(IoCommand::Send(bytes)) => {
                    forward(&peer_tx, bytes, max_chunk);
                }
                Some(IoCommand::Disconnect) | None => {
                    let _ = events.send(TransportEvent::Disconnected);
                    return;
                }
            },
            inbound = peer_rx.recv() => match inbound {
                Some(bytes) => {
                    if events.send(TransportEvent::BytesReceived(bytes)).is_err() {
                        return;
                    }
                }
                None => {
                    let _ = events.send(TransportEvent::Disconnected);
                    return;
                }
            },
        }
    }
}

fn forward(peer_tx: &mpsc::UnboundedSender<Bytes>, mut bytes: Bytes, max_chunk: usize) {
    if max_chunk == 0 {
        let _ = peer_tx.send(bytes);
        return;
    }

    while !bytes.is_empty() {
        let take = (OsRng.next_u32() as usize % max_chunk + 1).min(bytes.len());
        let piece = bytes.split_to(take);
        if peer_tx.send(piece).is_err() {
            return;
        }
    }
}
