//! # forge-crypto
//!
//! Cryptographic primitives for forge.
//!
//! ## Cryptographic Primitives
//!
//! - **Password hashing**: Argon2id, PHC string format
//! - **Session tokens**: HMAC-SHA256 over user id and expiry
//! - **Secrets at rest**: AES-256-GCM with the owner bound as associated data
//! - **Key derivation**: HKDF-SHA256 from one server secret into per-purpose subkeys
//!
//! ## Examples
//!
//! ```rust
//! use forge_crypto::{hash_password, verify_password, MasterKey, PasswordParams, SessionSigner};
//!
//! let hash = hash_password("password123", &PasswordParams::fast()).unwrap();
//! assert!(verify_password("password123", &hash).unwrap());
//!
//! let master = MasterKey::from_secret("a-very-long-server-secret-for-docs").unwrap();
//! let signer = SessionSigner::new(&master).unwrap();
//! let token = signer.sign("test@example.com").unwrap();
//! assert_eq!(signer.verify(&token).unwrap().user_id, "test@example.com");
//! ```

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod password;
pub mod session;

pub use cipher::{key_preview, KeySealer, SEAL_VERSION};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{DerivedKey, MasterKey, MIN_SECRET_LENGTH};
pub use password::{hash_password, verify_password, PasswordParams};
pub use session::{SessionClaims, SessionSigner, DEFAULT_SESSION_TTL_SECS};
pub use zeroize::Zeroizing;
