//! Server key material and HKDF subkey derivation.
//!
//! One server secret (`SESSION_SECRET`) is expanded with HKDF-SHA256 into
//! independent 256-bit subkeys, one per purpose, so the cookie signing key
//! and the API key sealing key never coincide.

use base64::Engine;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Minimum server secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// HKDF salt shared by every subkey.
const HKDF_SALT: &[u8] = b"forge-kdf-v1";

/// HKDF info label for the session cookie signing key.
pub const SESSION_KEY_INFO: &[u8] = b"forge/session-hmac";

/// HKDF info label for the API key sealing key.
pub const SEALING_KEY_INFO: &[u8] = b"forge/api-key-seal";

/// Key wrapper with automatic zeroization on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Create a new derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { key: bytes }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The server's root secret.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    secret: Vec<u8>,
}

impl MasterKey {
    /// Wrap a configured secret. Rejects secrets shorter than
    /// [`MIN_SECRET_LENGTH`] bytes.
    pub fn from_secret(secret: &str) -> CryptoResult<Self> {
        let bytes = secret.trim().as_bytes();
        if bytes.len() < MIN_SECRET_LENGTH {
            return Err(CryptoError::InvalidSecret(format!(
                "secret must be at least {} bytes, got {}",
                MIN_SECRET_LENGTH,
                bytes.len()
            )));
        }
        Ok(Self {
            secret: bytes.to_vec(),
        })
    }

    /// Random per-process secret. Sessions and sealed keys do not survive a
    /// restart when this is used.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = base64::engine::general_purpose::STANDARD
            .encode(bytes)
            .into_bytes();
        bytes.zeroize();
        Self { secret }
    }

    /// Expand a purpose-bound 256-bit subkey.
    pub fn derive(&self, info: &[u8]) -> CryptoResult<DerivedKey> {
        let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), &self.secret);
        let mut key = [0u8; 32];
        hkdf.expand(info, &mut key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(DerivedKey { key })
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
