//! Transport boundary.
//!
//! A transport is a byte-oriented connection capability: it accepts ordered
//! send requests and reports `Connected` / `BytesReceived` / `Disconnected`
//! events on a channel. It knows nothing about frames - reassembly is the
//! codec's job on the engine side.

pub mod loopback;
pub mod tcp;

use bytes::Bytes;
use tokio::sync::mpsc;

pub use loopback::LoopbackTransport;
pub use tcp::TcpTransport;

/// Events a transport delivers to its engine, in arrival order.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Connected,
    BytesReceived(Bytes),
    Disconnected,
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Connection capability handle held by the engine.
///
/// Every method enqueues work and returns immediately; completion and
/// failure surface as transport events. Sends are delivered in call order.
pub trait Transport: Send + Sync {
    /// Begin connecting. `Connected` is emitted on success, `Disconnected`
    /// on failure. A no-op for transports born connected.
    fn connect(&self);

    /// Queue bytes for in-order transmission.
    fn send(&self, bytes: Bytes);

    /// Close the connection; `Disconnected` follows.
    fn disconnect(&self);
}

/// Internal op queue shared by the transport implementations.
#[derive(Debug)]
pub(crate) enum IoCommand {
    Connect,
    Send(Bytes),
    Disconnect,
}
