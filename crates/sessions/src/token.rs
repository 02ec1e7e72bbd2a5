//! HMAC-signed bearer token verification.
//!
//! Token format: `hex(claims-json) + "." + hex(hmac-sha256(secret, claims-json))`.
//! Tokens are issued by the authentication collaborator; this module only
//! verifies them. Verification checks the signature (constant-time), the
//! expiry claim, and — when a TTL cap is configured — that the claimed
//! expiry does not exceed the accepted validity window.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use cr_domain::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub principal_id: String,
    pub principal_email: String,
    /// Pre-computed session fingerprint. Trusted verbatim when present.
    #[serde(default)]
    pub session_fingerprint: Option<String>,
    /// Expiry as a unix timestamp (seconds).
    pub exp: i64,
}

/// Signs and verifies bearer tokens with a shared HMAC secret.
pub struct TokenCodec {
    key: Vec<u8>,
    /// Maximum accepted validity window. A claimed expiry further out than
    /// this is rejected even when the signature checks out, so a leaked
    /// secret cannot mint effectively immortal tokens.
    max_ttl_secs: Option<i64>,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            max_ttl_secs: None,
        }
    }

    /// Cap the accepted validity window at `days`.
    pub fn with_ttl_days(mut self, days: u32) -> Self {
        self.max_ttl_secs = Some(i64::from(days) * 86_400);
        self
    }

    fn mac(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Sign claims into a token string (used by the authentication
    /// collaborator and by tests).
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        let payload = serde_json::to_vec(claims)?;
        let sig = self.mac(&payload);
        Ok(format!("{}.{}", hex::encode(&payload), hex::encode(sig)))
    }

    /// Verify a token and return its claims.
    ///
    /// Rejects malformed tokens, bad signatures, and expired claims with a
    /// typed `Auth` error.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let (payload_hex, sig_hex) = token
            .split_once('.')
            .ok_or_else(|| Error::Auth("malformed token".into()))?;

        let payload = hex::decode(payload_hex)
            .map_err(|_| Error::Auth("malformed token payload".into()))?;
        let sig = hex::decode(sig_hex)
            .map_err(|_| Error::Auth("malformed token signature".into()))?;

        let expected = self.mac(&payload);
        if !bool::from(expected.as_slice().ct_eq(sig.as_slice())) {
            return Err(Error::Auth("token signature mismatch".into()));
        }

        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|_| Error::Auth("unparseable token claims".into()))?;

        let now = Utc::now().timestamp();
        if claims.exp <= now {
            return Err(Error::Auth("token expired".into()));
        }
        if let Some(max_ttl) = self.max_ttl_secs {
            if claims.exp > now + max_ttl {
                return Err(Error::Auth("token expiry exceeds the validity window".into()));
            }
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset_secs: i64) -> Claims {
        Claims {
            principal_id: "user_42".into(),
            principal_email: "alice@example.com".into(),
            session_fingerprint: None,
            exp: Utc::now().timestamp() + exp_offset_secs,
        }
    }

    #[test]
    fn sign_verify_roundtrip() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&claims(3600)).unwrap();
        let verified = codec.verify(&token).unwrap();
        assert_eq!(verified.principal_email, "alice@example.com");
    }

    #[test]
    fn expired_token_rejected() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&claims(-10)).unwrap();
        let err = codec.verify(&token).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn wrong_key_rejected() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&claims(3600)).unwrap();
        let other = TokenCodec::new("different");
        assert!(matches!(other.verify(&token), Err(Error::Auth(_))));
    }

    #[test]
    fn tampered_payload_rejected() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&claims(3600)).unwrap();
        // Flip one hex digit in the payload half.
        let (payload, sig) = token.split_once('.').unwrap();
        let mut bytes: Vec<char> = payload.chars().collect();
        bytes[0] = if bytes[0] == 'a' { 'b' } else { 'a' };
        let tampered: String = bytes.into_iter().collect::<String>() + "." + sig;
        assert!(matches!(codec.verify(&tampered), Err(Error::Auth(_))));
    }

    #[test]
    fn expiry_beyond_ttl_cap_rejected() {
        let codec = TokenCodec::new("secret").with_ttl_days(30);

        // 29 days out: within the window.
        let token = codec.sign(&claims(29 * 86_400)).unwrap();
        assert!(codec.verify(&token).is_ok());

        // 60 days out: validly signed but claims too long a lifetime.
        let token = codec.sign(&claims(60 * 86_400)).unwrap();
        assert!(matches!(codec.verify(&token), Err(Error::Auth(_))));
    }

    #[test]
    fn no_ttl_cap_accepts_long_lived_tokens() {
        let codec = TokenCodec::new("secret");
        let token = codec.sign(&claims(365 * 86_400)).unwrap();
        assert!(codec.verify(&token).is_ok());
    }

    #[test]
    fn garbage_token_rejected() {
        let codec = TokenCodec::new("secret");
        assert!(matches!(codec.verify("not-a-token"), Err(Error::Auth(_))));
        assert!(matches!(codec.verify("zz.zz"), Err(Error::Auth(_))));
    }
}
