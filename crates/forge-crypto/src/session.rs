//! Signed session tokens.
//!
//! Token layout (all parts URL-safe, dot separated):
//!
//! ```text
//! base64url(user_id) . expiry_unix_secs . base64url(HMAC-SHA256(key, "<part1>.<part2>"))
//! ```
//!
//! The token is opaque to clients and stateless on the server. Whether the
//! user still exists is checked by the caller after [`SessionSigner::verify`].

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{DerivedKey, MasterKey, SESSION_KEY_INFO};

type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// What a verified token asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    key: DerivedKey,
    ttl: Duration,
}

impl SessionSigner {
    /// Build a signer from the server master key.
    pub fn new(master: &MasterKey) -> CryptoResult<Self> {
        Ok(Self {
            key: master.derive(SESSION_KEY_INFO)?,
            ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
        })
    }

    /// Override the token lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Configured lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> CryptoResult<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(self.key.as_bytes())
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }

    /// Issue a token for `user_id`, valid from `now` for the configured TTL.
    pub fn sign_at(&self, user_id: &str, now: DateTime<Utc>) -> CryptoResult<String> {
        let payload = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(user_id.as_bytes()),
            (now + self.ttl).timestamp()
        );
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", payload, sig))
    }

    /// Issue a token valid from now.
    pub fn sign(&self, user_id: &str) -> CryptoResult<String> {
        self.sign_at(user_id, Utc::now())
    }

    /// Verify signature and expiry as of `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> CryptoResult<SessionClaims> {
        let mut parts = token.trim().splitn(3, '.');
        let (user_b64, expiry, sig_b64) = match (parts.next(), parts.next(), parts.next()) {
            (Some(u), Some(e), Some(s)) if !u.is_empty() && !e.is_empty() && !s.is_empty() => {
                (u, e, s)
            }
            _ => {
                return Err(CryptoError::MalformedToken(
                    "expected three dot-separated parts".to_string(),
                ))
            }
        };

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|e| CryptoError::MalformedToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(user_b64.as_bytes());
        mac.update(b".");
        mac.update(expiry.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| CryptoError::InvalidSignature)?;

        let expiry_secs: i64 = expiry
            .parse()
            .map_err(|_| CryptoError::MalformedToken("expiry is not a number".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(expiry_secs, 0)
            .single()
            .ok_or_else(|| CryptoError::MalformedToken("expiry out of range".to_string()))?;
        if expires_at <= now {
            return Err(CryptoError::Expired);
        }

        let user_bytes = URL_SAFE_NO_PAD
            .decode(user_b64)
            .map_err(|e| CryptoError::MalformedToken(e.to_string()))?;
        let user_id = String::from_utf8(user_bytes)
            .map_err(|_| CryptoError::MalformedToken("user id is not UTF-8".to_string()))?;

        Ok(SessionClaims {
            user_id,
            expires_at,
        })
    }

    /// Verify as of now.
    pub fn verify(&self, token: &str) -> CryptoResult<SessionClaims> {
        self.verify_at(token, Utc::now())
    }
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> SessionSigner {
        let master = MasterKey::from_secret("test-secret-test-secret-test-secret").unwrap();
        SessionSigner::new(&master).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let s = signer();
        let token = s.sign("test@example.com").unwrap();
        let claims = s.verify(&token).unwrap();
        assert_eq!(claims.user_id, "test@example.com");
        assert!(claims.expires_at > Utc::now());
    }

    #[test]
    fn test_token_is_cookie_safe() {
        let token = signer().sign("a+b@example.com").unwrap();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
        assert_eq!(token.matches('.').count(), 2);
    }

    #[test]
    fn test_default_ttl_is_seven_days() {
        let s = signer();
        let now = Utc::now();
        let claims = s.verify_at(&s.sign_at("u@x.io", now).unwrap(), now).unwrap();
        assert_eq!(claims.expires_at.timestamp(), (now + Duration::days(7)).timestamp());
    }

    #[test]
    fn test_expired_token() {
        let s = signer().with_ttl(Duration::seconds(60));
        let issued = Utc::now() - Duration::seconds(120);
        let token = s.sign_at("u@x.io", issued).unwrap();
        assert!(matches!(s.verify(&token), Err(CryptoError::Expired)));
    }

    #[test]
    fn test_tampered_user_rejected() {
        let s = signer();
        let token = s.sign("alice@example.com").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_user = URL_SAFE_NO_PAD.encode("mallory@example.com");
        parts[0] = &forged_user;
        let forged = parts.join(".");
        assert!(matches!(s.verify(&forged), Err(CryptoError::InvalidSignature)));
    }

    #[test]
    fn test_tampered_expiry_rejected() {
        let s = signer();
        let token = s.sign("alice@example.com").unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], 9_999_999_999i64, parts[2]);
        assert!(matches!(s.verify(&forged), Err(CryptoError::InvalidSignature)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = signer().sign("alice@example.com").unwrap();
        let other = SessionSigner::new(
            &MasterKey::from_secret("another-secret-another-secret-xyz").unwrap(),
        )
        .unwrap();
        assert!(matches!(other.verify(&token), Err(CryptoError::InvalidSignature)));
    }

    #[test]
    fn test_malformed_tokens() {
        let s = signer();
        for token in ["", "abc", "a.b", "a..c", "..", "a.b.!!!"] {
            assert!(s.verify(token).is_err(), "{token:?} should fail");
        }
    }
}
