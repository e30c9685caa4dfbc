//! Wire protocol: typed frames and the length-prefixed stream codec.

pub mod codec;
pub mod frames;

pub use codec::{FrameCodec, MAX_FRAME_SIZE};
pub use frames::{
    encode_frame, FileChunk, FileEntry, Frame, Hello, KeyExchange, MessageType, PROTOCOL_VERSION,
};
