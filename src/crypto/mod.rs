//! Session cryptography: ECDH key schedule, directional AEAD, SAS tokens.

pub mod aead;
pub mod emoji;
pub mod session;

pub use aead::AeadSession;
pub use session::{SessionCrypto, SessionKeys};
