//! Session lifecycle states.

use std::fmt;

/// Engine lifecycle, ordered so the crypto cutover reads as a comparison:
/// every frame processed at `AwaitingSas` or later is AEAD-protected.
/// `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineState {
    Idle,
    TcpConnected,
    HandshakingCrypto,
    AwaitingSas,
    SessionSecured,
    Terminated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::TcpConnected => "tcp-connected",
            EngineState::HandshakingCrypto => "handshaking-crypto",
            EngineState::AwaitingSas => "awaiting-sas",
            EngineState::SessionSecured => "session-secured",
            EngineState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
