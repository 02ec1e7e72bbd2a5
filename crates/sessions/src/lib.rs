//! Caller identity and session bookkeeping.
//!
//! - [`fingerprint`] — derive a stable session identity from a request
//!   (verified token or anonymous connection metadata).
//! - [`token`] — HMAC-signed bearer token verification.
//! - [`registry`] — session identity → conversation context mapping.
//! - [`kv`] — the injected key-value store the registry persists through.

pub mod fingerprint;
pub mod kv;
pub mod registry;
pub mod token;

pub use fingerprint::{FingerprintResolver, Principal, RequestMeta};
pub use kv::{KeyValueStore, MemoryStore};
pub use registry::SessionRegistry;
pub use token::{Claims, TokenCodec};
