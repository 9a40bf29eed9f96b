//! AES-256-GCM sealing of secrets at rest.
//!
//! Sealed blob layout:
//!
//! ```text
//! ┌─────────┬──────────────┬──────────────────────────────┐
//! │ version │ nonce        │ ciphertext + tag             │
//! │ 1 byte  │ 12 bytes     │ len(plaintext) + 16 bytes    │
//! └─────────┴──────────────┴──────────────────────────────┘
//! ```
//!
//! The owning user id is bound in as associated data, so a blob copied onto
//! another user's row fails to open.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{DerivedKey, MasterKey, SEALING_KEY_INFO};

/// Current sealed blob format version.
pub const SEAL_VERSION: u8 = 1;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Generate cryptographically secure random bytes.
pub fn generate_random<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Generate a random nonce (12 bytes).
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    generate_random()
}

/// Encrypts and decrypts stored provider API keys.
#[derive(Clone)]
pub struct KeySealer {
    key: DerivedKey,
}

impl KeySealer {
    /// Build a sealer from the server master key.
    pub fn new(master: &MasterKey) -> CryptoResult<Self> {
        Ok(Self {
            key: master.derive(SEALING_KEY_INFO)?,
        })
    }

    fn cipher(&self) -> CryptoResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.key.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Seal `plaintext` for `owner`.
    pub fn seal(&self, owner: &str, plaintext: &str) -> CryptoResult<Vec<u8>> {
        let nonce = generate_nonce();
        let ciphertext = self
            .cipher()?
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: owner.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))?;

        let mut sealed = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        sealed.push(SEAL_VERSION);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a blob produced by [`KeySealer::seal`] for the same `owner`.
    pub fn open(&self, owner: &str, sealed: &[u8]) -> CryptoResult<Zeroizing<String>> {
        if sealed.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Decryption("sealed blob too short".to_string()));
        }
        if sealed[0] != SEAL_VERSION {
            return Err(CryptoError::UnsupportedVersion(sealed[0]));
        }
        let (nonce, ciphertext) = sealed[1..].split_at(NONCE_LEN);

        let plaintext = self
            .cipher()?
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: owner.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Decryption("AES-GCM decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::Decryption("plaintext is not UTF-8".to_string()))
    }
}

impl std::fmt::Debug for KeySealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySealer").field("key", &self.key).finish()
    }
}

/// Masked preview of a secret: `****` plus its last four characters.
/// Secrets of eight characters or fewer are fully masked.
pub fn key_preview(secret: &str) -> String {
    let chars: Vec<char> = secret.trim().chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealer() -> KeySealer {
        KeySealer::new(&MasterKey::from_secret("seal-test-secret-seal-test-secret").unwrap())
            .unwrap()
    }

    #[test]
    fn test_generate_nonce() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();
        assert_eq!(nonce1.len(), 12);
        assert_ne!(nonce1, nonce2);
    }

    #[test]
    fn test_seal_open() {
        let s = sealer();
        let sealed = s.seal("a@b.co", "sk-ant-api03-secret").unwrap();
        assert_eq!(sealed[0], SEAL_VERSION);
        assert_eq!(sealed.len(), 1 + 12 + "sk-ant-api03-secret".len() + 16);
        assert_eq!(s.open("a@b.co", &sealed).unwrap().as_str(), "sk-ant-api03-secret");
    }

    #[test]
    fn test_sealing_is_randomized() {
        let s = sealer();
        let a = s.seal("a@b.co", "same").unwrap();
        let b = s.seal("a@b.co", "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_with_wrong_owner_fails() {
        let s = sealer();
        let sealed = s.seal("alice@example.com", "secret").unwrap();
        assert!(matches!(
            s.open("bob@example.com", &sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let sealed = sealer().seal("a@b.co", "secret").unwrap();
        let other =
            KeySealer::new(&MasterKey::from_secret("other-secret-other-secret-other!").unwrap())
                .unwrap();
        assert!(other.open("a@b.co", &sealed).is_err());
    }

    #[test]
    fn test_open_tampered_fails() {
        let s = sealer();
        let mut sealed = s.seal("a@b.co", "secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(s.open("a@b.co", &sealed).is_err());
    }

    #[test]
    fn test_open_unknown_version() {
        let s = sealer();
        let mut sealed = s.seal("a@b.co", "secret").unwrap();
        sealed[0] = 7;
        assert!(matches!(
            s.open("a@b.co", &sealed),
            Err(CryptoError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn test_open_truncated() {
        assert!(sealer().open("a@b.co", &[SEAL_VERSION, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_key_preview() {
        assert_eq!(key_preview("sk-proj-abcdefgh1234"), "****1234");
        assert_eq!(key_preview("short"), "****");
        assert_eq!(key_preview("12345678"), "****");
        assert_eq!(key_preview("123456789"), "****6789");
    }
}
