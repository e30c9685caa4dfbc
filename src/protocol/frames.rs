//! Wire message types.
//!
//! Every frame on the wire is `len:u32be | type:u8 | payload`, where `len`
//! counts the type byte plus the payload. Hello and KeyExchange always travel
//! in the clear; every other tag is AEAD-protected once the session reaches
//! the cutover. The types here always model plaintext payloads - encryption
//! is applied by the engine around `encode_payload`/`decode`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Protocol version carried in Hello. Mismatches are fatal.
pub const PROTOCOL_VERSION: &str = "1.1";

// =============================================================================
// Message types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Hello = 0x01,
    KeyExchange = 0x02,
    AuthVerify = 0x03,
    RequestTree = 0x04,
    FileTreeChunk = 0x05,
    FileRequest = 0x06,
    FileChunk = 0x07,
    FileComplete = 0x08,
}

impl MessageType {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Hello),
            0x02 => Some(Self::KeyExchange),
            0x03 => Some(Self::AuthVerify),
            0x04 => Some(Self::RequestTree),
            0x05 => Some(Self::FileTreeChunk),
            0x06 => Some(Self::FileRequest),
            0x07 => Some(Self::FileChunk),
            0x08 => Some(Self::FileComplete),
            _ => None,
        }
    }
}

// =============================================================================
// File manifest entry
// =============================================================================

/// One regular file in a manifest. Produced by the scanner, exchanged in
/// FileTreeChunk, and compared during diffing by `(size, last_write_ticks)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the sync root, forward slashes, original case.
    pub relative_path: String,
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch.
    pub last_write_ticks: i64,
    /// Reserved for content-hash comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<String>, size: u64, last_write_ticks: i64) -> Self {
        Self {
            relative_path: relative_path.into(),
            size,
            last_write_ticks,
            hash: None,
        }
    }
}

// =============================================================================
// JSON payload bodies
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub version: String,
    pub device_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PathBody {
    relative_path: String,
}

// =============================================================================
// Binary payload bodies
// =============================================================================

/// KeyExchange payload: `pubkey_len:u32be | pubkey | salt[32]`.
/// The public key is a P-256 SubjectPublicKeyInfo in DER.
#[derive(Debug, Clone)]
pub struct KeyExchange {
    pub public_key: Bytes,
    pub salt: [u8; 32],
}

/// FileChunk payload: `path_len:u16be | path | offset:u64be | data`.
#[derive(Debug, Clone)]
pub struct FileChunk {
    pub relative_path: String,
    pub offset: u64,
    pub data: Bytes,
}

// =============================================================================
// Frame
// =============================================================================

/// Decoded protocol frame, tagged by message type.
#[derive(Debug, Clone)]
pub enum Frame {
    Hello(Hello),
    KeyExchange(KeyExchange),
    AuthVerify { accepted: bool },
    RequestTree,
    FileTreeChunk(Vec<FileEntry>),
    FileRequest { relative_path: String },
    FileChunk(FileChunk),
    FileComplete { relative_path: String },
}

impl Frame {
    pub fn message_type(&self) -> MessageType {
        match self {
            Frame::Hello(_) => MessageType::Hello,
            Frame::KeyExchange(_) => MessageType::KeyExchange,
            Frame::AuthVerify { .. } => MessageType::AuthVerify,
            Frame::RequestTree => MessageType::RequestTree,
            Frame::FileTreeChunk(_) => MessageType::FileTreeChunk,
            Frame::FileRequest { .. } => MessageType::FileRequest,
            Frame::FileChunk(_) => MessageType::FileChunk,
            Frame::FileComplete { .. } => MessageType::FileComplete,
        }
    }

    /// Encode the plaintext payload body (everything after the type byte).
    pub fn encode_payload(&self) -> Result<Bytes, EngineError> {
        match self {
            Frame::Hello(hello) => encode_json(hello),
            Frame::KeyExchange(kx) => {
                let mut buf = BytesMut::with_capacity(4 + kx.public_key.len() + 32);
                buf.put_u32(kx.public_key.len() as u32);
                buf.put_slice(&kx.public_key);
                buf.put_slice(&kx.salt);
                Ok(buf.freeze())
            }
            Frame::AuthVerify { accepted } => Ok(Bytes::from(vec![u8::from(*accepted)])),
            Frame::RequestTree => Ok(Bytes::new()),
            Frame::FileTreeChunk(entries) => encode_json(entries),
            Frame::FileRequest { relative_path } => encode_json(&PathBody {
                relative_path: relative_path.clone(),
            }),
            Frame::FileChunk(chunk) => {
                let path_bytes = chunk.relative_path.as_bytes();
                if path_bytes.len() > u16::MAX as usize {
                    return Err(EngineError::malformed("file chunk path too long"));
                }
                let mut buf = BytesMut::with_capacity(2 + path_bytes.len() + 8 + chunk.data.len());
                buf.put_u16(path_bytes.len() as u16);
                buf.put_slice(path_bytes);
                buf.put_u64(chunk.offset);
                buf.put_slice(&chunk.data);
                Ok(buf.freeze())
            }
            Frame::FileComplete { relative_path } => encode_json(&PathBody {
                relative_path: relative_path.clone(),
            }),
        }
    }

    /// Decode a plaintext payload body into a typed frame.
    pub fn decode(msg_type: MessageType, payload: Bytes) -> Result<Self, EngineError> {
        match msg_type {
            MessageType::Hello => Ok(Frame::Hello(decode_json(&payload, "Hello")?)),
            MessageType::KeyExchange => {
                let mut payload = payload;
                if payload.remaining() < 4 {
                    return Err(EngineError::malformed("KeyExchange header truncated"));
                }
                let key_len = payload.get_u32() as usize;
                if payload.remaining() < key_len + 32 {
                    return Err(EngineError::malformed("KeyExchange payload truncated"));
                }
                let public_key = payload.copy_to_bytes(key_len);
                let mut salt = [0u8; 32];
                payload.copy_to_slice(&mut salt);
                Ok(Frame::KeyExchange(KeyExchange { public_key, salt }))
            }
            MessageType::AuthVerify => {
                if payload.len() != 1 {
                    return Err(EngineError::malformed("AuthVerify payload must be one byte"));
                }
                Ok(Frame::AuthVerify {
                    accepted: payload[0] == 1,
                })
            }
            MessageType::RequestTree => {
                if !payload.is_empty() {
                    return Err(EngineError::malformed("RequestTree payload must be empty"));
                }
                Ok(Frame::RequestTree)
            }
            MessageType::FileTreeChunk => {
                Ok(Frame::FileTreeChunk(decode_json(&payload, "FileTreeChunk")?))
            }
            MessageType::FileRequest => {
                let body: PathBody = decode_json(&payload, "FileRequest")?;
                Ok(Frame::FileRequest {
                    relative_path: body.relative_path,
                })
            }
            MessageType::FileChunk => {
                let mut payload = payload;
                if payload.remaining() < 10 {
                    return Err(EngineError::malformed("FileChunk payload too short"));
                }
                let path_len = payload.get_u16() as usize;
                if payload.remaining() < path_len + 8 {
                    return Err(EngineError::malformed("FileChunk path truncated"));
                }
                let relative_path = String::from_utf8(payload.copy_to_bytes(path_len).to_vec())
                    .map_err(|_| EngineError::malformed("invalid UTF-8 in FileChunk path"))?;
                let offset = payload.get_u64();
                if offset > i64::MAX as u64 {
                    return Err(EngineError::malformed("negative FileChunk offset"));
                }
                let data = payload.copy_to_bytes(payload.remaining());
                Ok(Frame::FileChunk(FileChunk {
                    relative_path,
                    offset,
                    data,
                }))
            }
            MessageType::FileComplete => {
                let body: PathBody = decode_json(&payload, "FileComplete")?;
                Ok(Frame::FileComplete {
                    relative_path: body.relative_path,
                })
            }
        }
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<Bytes, EngineError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| EngineError::malformed(format!("JSON encode failed: {e}")))
}

fn decode_json<'a, T: Deserialize<'a>>(payload: &'a [u8], what: &str) -> Result<T, EngineError> {
    serde_json::from_slice(payload)
        .map_err(|e| EngineError::malformed(format!("invalid {what} JSON: {e}")))
}

/// Assemble the full on-wire bytes for a type byte and payload body.
/// The length field counts the type byte plus the payload.
pub fn encode_frame(msg_type: MessageType, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + 1 + payload.len());
    buf.put_u32(1 + payload.len() as u32);
    buf.put_u8(msg_type as u8);
    buf.put_slice(payload);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(frame: Frame) -> Frame {
        let msg_type = frame.message_type();
        let payload = frame.encode_payload().unwrap();
        Frame::decode(msg_type, payload).unwrap()
    }

    #[test]
    fn test_hello_round_trip() {
        let decoded = round_trip(Frame::Hello(Hello {
            version: PROTOCOL_VERSION.to_string(),
            device_name: "workstation".to_string(),
        }));
        match decoded {
            Frame::Hello(hello) => {
                assert_eq!(hello.version, "1.1");
                assert_eq!(hello.device_name, "workstation");
            }
            other => panic!("expected Hello, got {:?}", other),
        }
    }

    #[test]
    fn test_key_exchange_round_trip() {
        let decoded = round_trip(Frame::KeyExchange(KeyExchange {
            public_key: Bytes::from_static(b"not-a-real-spki"),
            salt: [7u8; 32],
        }));
        match decoded {
            Frame::KeyExchange(kx) => {
                assert_eq!(&kx.public_key[..], b"not-a-real-spki");
                assert_eq!(kx.salt, [7u8; 32]);
            }
            other => panic!("expected KeyExchange, got {:?}", other),
        }
    }

    #[test]
    fn test_key_exchange_truncated_salt() {
        let mut buf = BytesMut::new();
        buf.put_u32(4);
        buf.put_slice(b"abcd");
        buf.put_slice(&[0u8; 16]); // half a salt
        let err = Frame::decode(MessageType::KeyExchange, buf.freeze()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrame(_)));
    }

    #[test]
    fn test_file_chunk_round_trip() {
        let decoded = round_trip(Frame::FileChunk(FileChunk {
            relative_path: "dir/video.mp4".to_string(),
            offset: 65536,
            data: Bytes::from_static(&[1, 2, 3, 4]),
        }));
        match decoded {
            Frame::FileChunk(chunk) => {
                assert_eq!(chunk.relative_path, "dir/video.mp4");
                assert_eq!(chunk.offset, 65536);
                assert_eq!(&chunk.data[..], &[1, 2, 3, 4]);
            }
            other => panic!("expected FileChunk, got {:?}", other),
        }
    }

    #[test]
    fn test_file_chunk_rejects_short_payload() {
        let err = Frame::decode(MessageType::FileChunk, Bytes::from_static(&[0u8; 9])).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrame(_)));
    }

    #[test]
    fn test_file_chunk_rejects_path_beyond_bounds() {
        let mut buf = BytesMut::new();
        buf.put_u16(200); // claims a 200-byte path
        buf.put_slice(b"short");
        buf.put_u64(0);
        let err = Frame::decode(MessageType::FileChunk, buf.freeze()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrame(_)));
    }

    #[test]
    fn test_file_chunk_rejects_negative_offset() {
        let mut buf = BytesMut::new();
        buf.put_u16(1);
        buf.put_slice(b"a");
        buf.put_u64(u64::MAX); // -1 as a signed offset
        let err = Frame::decode(MessageType::FileChunk, buf.freeze()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrame(_)));
    }

    #[test]
    fn test_file_tree_chunk_preserves_order() {
        let entries = vec![
            FileEntry::new("test1.txt", 1024, 123456789),
            FileEntry::new("folder/test2.jpg", 2048, 987654321),
        ];
        let decoded = round_trip(Frame::FileTreeChunk(entries.clone()));
        match decoded {
            Frame::FileTreeChunk(got) => assert_eq!(got, entries),
            other => panic!("expected FileTreeChunk, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_verify_requires_single_byte() {
        let err =
            Frame::decode(MessageType::AuthVerify, Bytes::from_static(&[1, 0])).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFrame(_)));
    }

    #[test]
    fn test_unknown_tag() {
        assert!(MessageType::from_u8(0x09).is_none());
        assert!(MessageType::from_u8(0x00).is_none());
    }

    #[test]
    fn test_encode_frame_length_counts_type_byte() {
        let wire = encode_frame(MessageType::RequestTree, &[]);
        assert_eq!(&wire[..], &[0, 0, 0, 1, 0x04]);
    }
}
