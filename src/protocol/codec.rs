//! Incremental frame reassembly.
//!
//! The transport delivers an arbitrary-chunked byte stream; this codec turns
//! it back into whole `type || payload` frames. Partial trailers stay
//! buffered across `feed` calls.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::EngineError;

/// Maximum frame size (10 MiB) - prevents OOM from malicious or corrupted
/// length headers.
pub const MAX_FRAME_SIZE: u32 = 10 * 1024 * 1024;

const INITIAL_BUFFER_SIZE: usize = 64 * 1024;

/// Stateful length-prefixed frame reassembler.
///
/// `feed` appends a chunk and drains every frame that is now complete. Each
/// returned frame is the `type || payload` bytes with the 4-byte length
/// header stripped. An invalid length is fatal: the codec must not be fed
/// again afterwards.
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, EngineError> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            if self.buffer.len() < 4 {
                break;
            }

            let len = u32::from_be_bytes([
                self.buffer[0],
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
            ]);
            if len == 0 || len > MAX_FRAME_SIZE {
                return Err(EngineError::InvalidFrameLength(len as u64));
            }

            let total = 4 + len as usize;
            if self.buffer.len() < total {
                break;
            }

            self.buffer.advance(4);
            frames.push(self.buffer.split_to(len as usize).freeze());
        }

        Ok(frames)
    }

    /// Bytes currently buffered waiting for the rest of a frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}
