//! Session engine: handshake, crypto cutover, and application traffic,
//! serialized onto a single consumer task.

mod actor;
mod command;
mod event;
mod state;

pub use event::EngineEvent;
pub use state::EngineState;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use crate::config::EngineConfig;
use crate::protocol::FileEntry;
use crate::transport::{Transport, TransportEventReceiver};

use actor::Engine;
use command::Command;

pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Spawn an engine over a transport. Returns the command handle and the
/// event stream; the event channel closes when the engine terminates.
pub fn spawn_engine(
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    mut transport_events: TransportEventReceiver,
) -> (EngineHandle, EngineEventReceiver) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(EngineState::Idle);

    // Transport events are just another producer onto the command queue.
    let pump_tx = command_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = transport_events.recv().await {
            if pump_tx.send(Command::Transport(event)).is_err() {
                break;
            }
        }
    });

    let engine = Engine::new(config, transport, event_tx, state_tx);
    tokio::spawn(engine.run(command_rx));

    (
        EngineHandle {
            commands: command_tx,
            state: state_rx,
        },
        event_rx,
    )
}

/// Cloneable command handle. Safe to call from any task; each method
/// enqueues one command and returns. Commands sent after termination are
/// silently dropped.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<EngineState>,
}

impl EngineHandle {
    pub fn start_connection(&self) {
        self.send(Command::StartConnection);
    }

    pub fn confirm_sas(&self, accepted: bool) {
        self.send(Command::ConfirmSas(accepted));
    }

    pub fn request_remote_tree(&self) {
        self.send(Command::RequestTree);
    }

    pub fn send_file_tree(&self, files: Vec<FileEntry>) {
        self.send(Command::SendTree(files));
    }

    pub fn request_file(&self, path: impl Into<String>) {
        self.send(Command::RequestFile(path.into()));
    }

    pub fn send_file_chunk(&self, path: impl Into<String>, offset: u64, data: Bytes) {
        self.send(Command::SendFileChunk {
            path: path.into(),
            offset,
            data,
        });
    }

    pub fn send_file_complete(&self, path: impl Into<String>) {
        self.send(Command::SendFileComplete(path.into()));
    }

    /// Last state published by the consumer task.
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }
}
