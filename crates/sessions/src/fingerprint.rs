//! Session fingerprinting — derive a stable session identity per caller.
//!
//! Authenticated callers get an identity derived from their verified
//! principal (same email ⇒ same identity on every call). Anonymous callers
//! get a best-effort fingerprint hashed from connection metadata. Token
//! verification failure never aborts a request — it degrades to the
//! anonymous path and logs the downgrade.

use sha2::{Digest, Sha256};

use cr_domain::trace::TraceEvent;

use crate::token::TokenCodec;

/// Connection/request metadata the resolver hashes for anonymous callers.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Bearer token, already stripped of the `Bearer ` prefix.
    pub bearer: Option<String>,
    pub remote_addr: String,
    pub user_agent: String,
    pub accept_language: String,
    pub accept_encoding: String,
}

/// The verified caller, exposed for audit/logging purposes.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

/// Derives a [`SessionIdentity`](crate::registry) string from a request.
///
/// Pure function of request + verification secret; no side effects.
pub struct FingerprintResolver {
    /// `None` when no verification secret is configured — every caller is
    /// then treated as anonymous.
    codec: Option<TokenCodec>,
}

impl FingerprintResolver {
    pub fn new(codec: Option<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Resolve a request to a session identity and, when a valid token was
    /// presented, the decoded principal.
    pub fn resolve(&self, meta: &RequestMeta) -> (String, Option<Principal>) {
        if let (Some(token), Some(codec)) = (meta.bearer.as_deref(), self.codec.as_ref()) {
            match codec.verify(token) {
                Ok(claims) => {
                    let identity = match claims.session_fingerprint {
                        // Fingerprint minted by the auth collaborator is
                        // trusted verbatim.
                        Some(fp) if !fp.is_empty() => fp,
                        _ => digest(&format!("principal:{}", claims.principal_email)),
                    };
                    let principal = Principal {
                        id: claims.principal_id,
                        email: claims.principal_email,
                    };
                    return (identity, Some(principal));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "token verification failed, falling back to anonymous fingerprint");
                    TraceEvent::FingerprintDowngraded {
                        reason: e.to_string(),
                    }
                    .emit();
                }
            }
        }

        (self.anonymous_fingerprint(meta), None)
    }

    fn anonymous_fingerprint(&self, meta: &RequestMeta) -> String {
        digest(&format!(
            "{}|{}|{}|{}",
            meta.remote_addr, meta.user_agent, meta.accept_language, meta.accept_encoding
        ))
    }
}

/// The fixed one-way hash used for all identity derivation.
fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}
