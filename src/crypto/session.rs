//! Per-connection key schedule.
//!
//! An ephemeral P-256 keypair plus a 32-byte salt on each side; one ECDH
//! agreement; HKDF-SHA256 expansion into two directional AES keys, two
//! directional base nonces, and the short authentication string. Every
//! intermediate buffer is zeroed before `derive` returns, and the private
//! key is consumed by the derivation itself.

use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::pkcs8::{DecodePublicKey, EncodePublicKey};
use p256::PublicKey;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::emoji;
use crate::error::EngineError;

const INFO_KEY_C2S: &[u8] = b"local-p2p v1.1 key c2s";
const INFO_KEY_S2C: &[u8] = b"local-p2p v1.1 key s2c";
const INFO_NONCE_C2S: &[u8] = b"local-p2p v1.1 nonce c2s";
const INFO_NONCE_S2C: &[u8] = b"local-p2p v1.1 nonce s2c";
const INFO_SAS: &[u8] = b"local-p2p v1.1 sas";

/// Directional session keys produced by a successful derivation.
///
/// `tx`/`rx` are already assigned for the deriving side: the server
/// transmits on s2c and receives on c2s, the client the other way around.
#[derive(Debug)]
pub struct SessionKeys {
    pub tx_key: Zeroizing<[u8; 32]>,
    pub rx_key: Zeroizing<[u8; 32]>,
    pub tx_base_nonce: Zeroizing<[u8; 12]>,
    pub rx_base_nonce: Zeroizing<[u8; 12]>,
    pub sas: [&'static str; 4],
}

/// Ephemeral handshake material for one connection.
///
/// The private key lives only until `derive` consumes it; a second `derive`
/// on the same instance is an error.
pub struct SessionCrypto {
    secret: Option<EphemeralSecret>,
    public_spki: Vec<u8>,
    salt: [u8; 32],
}

impl SessionCrypto {
    pub fn new() -> Result<Self, EngineError> {
        let secret = EphemeralSecret::random(&mut OsRng);
        let public_spki = secret
            .public_key()
            .to_public_key_der()
            .map_err(|e| EngineError::KeyExchange(format!("SPKI export failed: {e}")))?
            .as_bytes()
            .to_vec();

        let mut salt = [0u8; 32];
        OsRng.fill_bytes(&mut salt);

        Ok(Self {
            secret: Some(secret),
            public_spki,
            salt,
        })
    }

    /// Own public key as SubjectPublicKeyInfo DER, for the KeyExchange frame.
    pub fn public_spki(&self) -> &[u8] {
        &self.public_spki
    }

    pub fn salt(&self) -> [u8; 32] {
        self.salt
    }

    /// Run the agreement and key schedule against the peer's material.
    ///
    /// `is_server` selects salt ordering and directional assignment; the
    /// client's salt always goes first in the combined salt, on both sides.
    pub fn derive(
        &mut self,
        peer_spki: &[u8],
        peer_salt: &[u8; 32],
        is_server: bool,
    ) -> Result<SessionKeys, EngineError> {
        let secret = self
            .secret
            .take()
            .ok_or_else(|| EngineError::KeyExchange("key material already consumed".into()))?;

        // The P-256 SPKI decoder rejects keys declaring any other curve.
        let peer_public =
            PublicKey::from_public_key_der(peer_spki).map_err(|_| EngineError::CurveMismatch)?;

        let shared = secret.diffie_hellman(&peer_public);

        let mut combined_salt = Zeroizing::new([0u8; 64]);
        let (client_salt, server_salt) = if is_server {
            (peer_salt, &self.salt)
        } else {
            (&self.salt, peer_salt)
        };
        combined_salt[..32].copy_from_slice(client_salt);
        combined_salt[32..].copy_from_slice(server_salt);

        let hk = Hkdf::<Sha256>::new(Some(combined_salt.as_ref()), shared.raw_secret_bytes());

        let mut key_c2s = Zeroizing::new([0u8; 32]);
        let mut key_s2c = Zeroizing::new([0u8; 32]);
        let mut nonce_c2s = Zeroizing::new([0u8; 12]);
        let mut nonce_s2c = Zeroizing::new([0u8; 12]);
        let mut sas_bytes = Zeroizing::new([0u8; 4]);

        expand(&hk, INFO_KEY_C2S, key_c2s.as_mut())?;
        expand(&hk, INFO_KEY_S2C, key_s2c.as_mut())?;
        expand(&hk, INFO_NONCE_C2S, nonce_c2s.as_mut())?;
        expand(&hk, INFO_NONCE_S2C, nonce_s2c.as_mut())?;
        expand(&hk, INFO_SAS, sas_bytes.as_mut())?;

        let sas = emoji::sas_tokens(&sas_bytes);

        // Copy into fresh directional buffers; the c2s/s2c originals and the
        // shared secret zero themselves when they drop at the end of scope.
        let keys = if is_server {
            SessionKeys {
                tx_key: key_s2c.clone(),
                rx_key: key_c2s.clone(),
                tx_base_nonce: nonce_s2c.clone(),
                rx_base_nonce: nonce_c2s.clone(),
                sas,
            }
        } else {
            SessionKeys {
                tx_key: key_c2s.clone(),
                rx_key: key_s2c.clone(),
                tx_base_nonce: nonce_c2s.clone(),
                rx_base_nonce: nonce_s2c.clone(),
                sas,
            }
        };

        Ok(keys)
    }
}

fn expand(hk: &Hkdf<Sha256>, info: &[u8], out: &mut [u8]) -> Result<(), EngineError> {
    hk.expand(info, out)
        .map_err(|_| EngineError::KeyExchange("HKDF expand failed".into()))
}
