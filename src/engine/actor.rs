//! The engine actor: one consumer task owning all session state.
//!
//! Producers (transport pump, application handles) only enqueue commands;
//! every state transition, encrypt, and decrypt happens on the consumer, in
//! queue order, with no await points inside a command handler. That makes
//! each transition atomic and the `>= AwaitingSas` cutover rule sound
//! without any locking.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::crypto::{AeadSession, SessionCrypto};
use crate::engine::command::Command;
use crate::engine::event::EngineEvent;
use crate::engine::state::EngineState;
use crate::error::EngineError;
use crate::protocol::{
    encode_frame, FileChunk, Frame, FrameCodec, Hello, KeyExchange, MessageType, PROTOCOL_VERSION,
};
use crate::transport::{Transport, TransportEvent};

pub(crate) struct Engine {
    state: EngineState,
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    codec: FrameCodec,
    crypto: Option<SessionCrypto>,
    aead: Option<AeadSession>,
    events: mpsc::UnboundedSender<EngineEvent>,
    state_tx: watch::Sender<EngineState>,
}

impl Engine {
    pub(crate) fn new(
        config: EngineConfig,
        transport: Arc<dyn Transport>,
        events: mpsc::UnboundedSender<EngineEvent>,
        state_tx: watch::Sender<EngineState>,
    ) -> Self {
        Self {
            state: EngineState::Idle,
            config,
            transport,
            codec: FrameCodec::new(),
            crypto: None,
            aead: None,
            events,
            state_tx,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            if let Err(err) = self.handle_command(command) {
                self.fail(err);
            }
            if self.state == EngineState::Terminated {
                // Absorbing: drop the queue so later commands vanish and the
                // event channel closes, which is how observers learn the
                // session is over.
                break;
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::StartConnection => {
                if self.state == EngineState::Idle {
                    self.transport.connect();
                }
                Ok(())
            }
            Command::Transport(TransportEvent::Connected) => self.handle_connected(),
            Command::Transport(TransportEvent::BytesReceived(chunk)) => {
                for frame in self.codec.feed(&chunk)? {
                    self.handle_frame(frame)?;
                }
                Ok(())
            }
            Command::Transport(TransportEvent::Disconnected) => {
                debug!("transport disconnected");
                self.set_state(EngineState::Terminated);
                Ok(())
            }
            Command::ConfirmSas(accepted) => self.handle_confirm_sas(accepted),
            Command::RequestTree => self.send_secured(Frame::RequestTree),
            Command::SendTree(files) => self.send_secured(Frame::FileTreeChunk(files)),
            Command::RequestFile(path) => self.send_secured(Frame::FileRequest {
                relative_path: path,
            }),
            Command::SendFileChunk { path, offset, data } => {
                self.send_secured(Frame::FileChunk(FileChunk {
                    relative_path: path,
                    offset,
                    data,
                }))
            }
            Command::SendFileComplete(path) => self.send_secured(Frame::FileComplete {
                relative_path: path,
            }),
        }
    }

    fn handle_connected(&mut self) -> Result<(), EngineError> {
        if self.state >= EngineState::HandshakingCrypto {
            // Already past the greeting, e.g. the passive side responded to
            // our Hello before the Connected event drained.
            return Ok(());
        }
        self.set_state(EngineState::TcpConnected);
        self.send_hello()?;
        self.set_state(EngineState::HandshakingCrypto);
        Ok(())
    }

    /// Process one reassembled `type || payload` frame.
    fn handle_frame(&mut self, frame: Bytes) -> Result<(), EngineError> {
        if frame.is_empty() {
            return Err(EngineError::violation("empty frame"));
        }
        let tag = frame[0];
        let mut body = frame.slice(1..);

        // Crypto cutover: everything after the key exchange is ciphertext.
        if self.state >= EngineState::AwaitingSas {
            let aead = self
                .aead
                .as_mut()
                .ok_or_else(|| EngineError::violation("ciphertext before key agreement"))?;
            body = Bytes::from(aead.decrypt(&body, &[tag])?);
        }

        let msg_type = MessageType::from_u8(tag)
            .ok_or_else(|| EngineError::violation(format!("unknown message tag 0x{tag:02x}")))?;

        match Frame::decode(msg_type, body)? {
            Frame::Hello(hello) => self.handle_hello(hello),
            Frame::KeyExchange(kx) => self.handle_key_exchange(kx),
            Frame::AuthVerify { accepted } => self.handle_auth_verify(accepted),
            Frame::RequestTree => {
                self.require_secured("RequestTree")?;
                self.emit(EngineEvent::RemoteTreeRequested);
                Ok(())
            }
            Frame::FileTreeChunk(files) => {
                self.require_secured("FileTreeChunk")?;
                self.emit(EngineEvent::RemoteTreeReceived(files));
                Ok(())
            }
            Frame::FileRequest { relative_path } => {
                self.require_secured("FileRequest")?;
                self.emit(EngineEvent::FileRequested(relative_path));
                Ok(())
            }
            Frame::FileChunk(chunk) => {
                self.require_secured("FileChunk")?;
                self.emit(EngineEvent::FileChunkReceived {
                    path: chunk.relative_path,
                    offset: chunk.offset,
                    data: chunk.data,
                });
                Ok(())
            }
            Frame::FileComplete { relative_path } => {
                self.require_secured("FileComplete")?;
                self.emit(EngineEvent::FileCompleteReceived(relative_path));
                Ok(())
            }
        }
    }

    fn handle_hello(&mut self, hello: Hello) -> Result<(), EngineError> {
        if self.state < EngineState::HandshakingCrypto {
            // Passive side: the peer greeted first, answer before replying
            // with the key exchange.
            self.set_state(EngineState::TcpConnected);
            self.send_hello()?;
            self.set_state(EngineState::HandshakingCrypto);
        }
        if self.state != EngineState::HandshakingCrypto {
            return Err(EngineError::violation(format!(
                "Hello in state {}",
                self.state
            )));
        }
        if hello.version != PROTOCOL_VERSION {
            return Err(EngineError::VersionMismatch(hello.version));
        }
        debug!(peer = %hello.device_name, "peer hello");

        let crypto = match self.crypto.take() {
            Some(existing) => existing,
            None => SessionCrypto::new()?,
        };
        let key_exchange = Frame::KeyExchange(KeyExchange {
            public_key: Bytes::copy_from_slice(crypto.public_spki()),
            salt: crypto.salt(),
        });
        self.crypto = Some(crypto);
        self.send_frame(&key_exchange)
    }

    fn handle_key_exchange(&mut self, kx: KeyExchange) -> Result<(), EngineError> {
        if self.state != EngineState::HandshakingCrypto {
            return Err(EngineError::violation(format!(
                "KeyExchange in state {}",
                self.state
            )));
        }
        let mut crypto = self
            .crypto
            .take()
            .ok_or_else(|| EngineError::violation("KeyExchange before Hello"))?;

        let keys = crypto.derive(&kx.public_key, &kx.salt, self.config.role.is_server())?;
        let sas = keys.sas;
        self.aead = Some(AeadSession::new(keys));
        self.set_state(EngineState::AwaitingSas);
        self.emit(EngineEvent::SasGenerated(sas));
        Ok(())
    }

    fn handle_auth_verify(&mut self, accepted: bool) -> Result<(), EngineError> {
        if self.state == EngineState::SessionSecured {
            // An in-flight duplicate from the peer is harmless.
            debug!("duplicate AuthVerify ignored");
            return Ok(());
        }
        if self.state != EngineState::AwaitingSas {
            return Err(EngineError::violation(format!(
                "AuthVerify in state {}",
                self.state
            )));
        }
        if !accepted {
            return Err(EngineError::PeerRejectedSas);
        }
        self.set_state(EngineState::SessionSecured);
        self.emit(EngineEvent::SessionSecured);
        Ok(())
    }

    fn handle_confirm_sas(&mut self, accepted: bool) -> Result<(), EngineError> {
        if self.state != EngineState::AwaitingSas {
            return Err(EngineError::violation(format!(
                "ConfirmSas in state {}",
                self.state
            )));
        }
        if !accepted {
            return Err(EngineError::SasRejected);
        }
        self.send_frame(&Frame::AuthVerify { accepted: true })
    }

    fn send_hello(&mut self) -> Result<(), EngineError> {
        self.send_frame(&Frame::Hello(Hello {
            version: PROTOCOL_VERSION.to_string(),
            device_name: self.config.device_name.clone(),
        }))
    }

    /// Encode and transmit, encrypting once the session is past the cutover.
    fn send_frame(&mut self, frame: &Frame) -> Result<(), EngineError> {
        let msg_type = frame.message_type();
        let payload = frame.encode_payload()?;

        let body = if self.state >= EngineState::AwaitingSas {
            let aead = self
                .aead
                .as_mut()
                .ok_or_else(|| EngineError::violation("encrypted send before key agreement"))?;
            Bytes::from(aead.encrypt(&payload, &[msg_type as u8])?)
        } else {
            payload
        };

        self.transport.send(encode_frame(msg_type, &body));
        Ok(())
    }

    fn send_secured(&mut self, frame: Frame) -> Result<(), EngineError> {
        if self.state != EngineState::SessionSecured {
            return Err(EngineError::violation(format!(
                "{:?} requires a secured session, state is {}",
                frame.message_type(),
                self.state
            )));
        }
        self.send_frame(&frame)
    }

    fn require_secured(&self, what: &str) -> Result<(), EngineError> {
        if self.state != EngineState::SessionSecured {
            return Err(EngineError::violation(format!(
                "{what} in state {}",
                self.state
            )));
        }
        Ok(())
    }

    fn set_state(&mut self, next: EngineState) {
        debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        let _ = self.state_tx.send(next);
    }

    fn fail(&mut self, err: EngineError) {
        error!(error = %err, "engine terminated");
        self.set_state(EngineState::Terminated);
        self.crypto = None;
        self.aead = None;
        self.emit(EngineEvent::Error(err.to_string()));
        self.transport.disconnect();
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }
}
