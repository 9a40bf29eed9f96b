//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Stored password hash is not a valid PHC string.
    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed - wrong key or corrupted data.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// Sealed blob uses a format version this build cannot read.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    /// Session token is malformed.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Session token signature does not match.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Session token is past its expiry.
    #[error("Token expired")]
    Expired,

    /// Server secret is unusable.
    #[error("Invalid secret: {0}")]
    InvalidSecret(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
