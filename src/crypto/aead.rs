//! Authenticated framing for the secured phase of a session.
//!
//! AES-256-GCM with a 96-bit nonce and 128-bit tag. Each direction carries
//! its own key, base nonce, and a u64 sequence counter starting at zero; the
//! per-frame nonce XORs the big-endian counter into the trailing 8 bytes of
//! the base. The one-byte message tag rides as associated data, binding each
//! ciphertext to its declared message kind.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use zeroize::Zeroizing;

use crate::crypto::session::SessionKeys;
use crate::error::EngineError;

const TAG_SIZE: usize = 16;

struct Direction {
    cipher: Aes256Gcm,
    base_nonce: Zeroizing<[u8; 12]>,
    seq: u64,
}

impl Direction {
    fn new(key: &Zeroizing<[u8; 32]>, base_nonce: Zeroizing<[u8; 12]>) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref())),
            base_nonce,
            seq: 0,
        }
    }

    fn nonce(&self) -> [u8; 12] {
        let mut nonce = *self.base_nonce;
        let counter = self.seq.to_be_bytes();
        for (n, c) in nonce[4..].iter_mut().zip(counter) {
            *n ^= c;
        }
        nonce
    }
}

/// Directional AEAD state for one secured session.
pub struct AeadSession {
    tx: Direction,
    rx: Direction,
}

impl AeadSession {
    pub fn new(keys: SessionKeys) -> Self {
        Self {
            tx: Direction::new(&keys.tx_key, keys.tx_base_nonce),
            rx: Direction::new(&keys.rx_key, keys.rx_base_nonce),
        }
    }

    /// Encrypt one outgoing frame body. Returns `ciphertext || tag` and
    /// advances the transmit counter by exactly one.
    pub fn encrypt(&mut self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, EngineError> {
        if self.tx.seq == u64::MAX {
            return Err(EngineError::SequenceExhausted);
        }

        let nonce = self.tx.nonce();
        let ciphertext = self
            .tx
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| EngineError::AuthenticationFailed)?;

        self.tx.seq += 1;
        Ok(ciphertext)
    }

    /// Verify and decrypt one incoming frame body. Advances the receive
    /// counter only on success; a failed tag check delivers nothing.
    pub fn decrypt(&mut self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, EngineError> {
        if ciphertext.len() < TAG_SIZE {
            return Err(EngineError::malformed("ciphertext shorter than AEAD tag"));
        }
        if self.rx.seq == u64::MAX {
            return Err(EngineError::SequenceExhausted);
        }

        let nonce = self.rx.nonce();
        let plaintext = self
            .rx
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| EngineError::AuthenticationFailed)?;

        self.rx.seq += 1;
        Ok(plaintext)
    }

    pub fn tx_seq(&self) -> u64 {
        self.tx.seq
    }

    pub fn rx_seq(&self) -> u64 {
        self.rx.seq
    }
}
