//! TCP stream transport.
//!
//! Initiator form dials on `connect()`; responder form wraps an accepted
//! stream and is born connected. A reader task turns socket reads into
//! `BytesReceived` events while the driver task owns the write half and the
//! op queue, so send ordering follows op order.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use super::{IoCommand, Transport, TransportEvent, TransportEventReceiver, TransportEventSender};

const READ_BUFFER_SIZE: usize = 64 * 1024;

pub struct TcpTransport {
    ops: mpsc::UnboundedSender<IoCommand>,
}

impl TcpTransport {
    /// Initiator: dials `addr` when the engine calls `connect()`.
    pub fn connect_to(addr: SocketAddr) -> (Arc<Self>, TransportEventReceiver) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();

        tokio::spawn(drive_initiator(addr, ops_rx, events_tx));

        (Arc::new(Self { ops: ops_tx }), events_rx)
    }

    /// Responder: wraps an accepted stream. Emits `Connected` immediately.
    pub fn from_stream(stream: TcpStream) -> (Arc<Self>, TransportEventReceiver) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();

        let _ = events_tx.send(TransportEvent::Connected);
        tokio::spawn(async move {
            drive_stream(stream, ops_rx, events_tx).await;
        });

        (Arc::new(Self { ops: ops_tx }), events_rx)
    }
}

impl Transport for TcpTransport {
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

async fn drive_initiator(
    addr: SocketAddr,
    mut ops: mpsc::UnboundedReceiver<IoCommand>,
    events: TransportEventSender,
) {
    // Nothing happens until the engine asks for the dial.
    loop {
        match ops.recv().await {
            Some(IoCommand::Connect) => break,
            Some(IoCommand::Disconnect) | None => {
                let _ = events.send(TransportEvent::Disconnected);
                return;
            }
            Some(IoCommand::Send(_)) => {
                debug!("dropping send before connect");
            }
        }
    }

    match TcpStream::connect(addr).await {
        Ok(stream) => {
            let _ = events.send(TransportEvent::Connected);
            drive_stream(stream, ops, events).await;
        }
        Err(e) => {
            debug!(error = %e, "TCP connect failed");
            let _ = events.send(TransportEvent::Disconnected);
        }
    }
}

async fn drive_stream(
    stream: TcpStream,
    ops: mpsc::UnboundedReceiver<IoCommand>,
    events: TransportEventSender,
) {
    let (read_half, write_half) = stream.into_split();

    let reader = tokio::spawn(read_loop(read_half, events.clone()));
    write_loop(write_half, ops, events).await;
    reader.abort();
}

async fn read_loop(mut read_half: OwnedReadHalf, events: TransportEventSender) {
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        buf.clear();
        match read_half.read_buf(&mut buf).await {
            Ok(0) | Err(_) => {
                let _ = events.send(TransportEvent::Disconnected);
                return;
            }
            Ok(_) => {
                let chunk = buf.split().freeze();
                if events.send(TransportEvent::BytesReceived(chunk)).is_err() {
                    return;
                }
            }
        }
    }
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut ops: mpsc::UnboundedReceiver<IoCommand>,
    events: TransportEventSender,
) {
    while let Some(op) = ops.recv().await {
        match op {
            IoCommand::Send(bytes) => {
                if let Err(e) = write_half.write_all(&bytes).await {
                    debug!(error = %e, "TCP write failed");
                    let _ = events.send(TransportEvent::Disconnected);
                    return;
                }
            }
            IoCommand::Disconnect => {
                let _ = write_half.shutdown().await;
                let _ = events.send(TransportEvent::Disconnected);
                return;
            }
            IoCommand::Connect => {}
        }
    }
}
