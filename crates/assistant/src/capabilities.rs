//! Capability negotiation — performed once at startup.
//!
//! Older deployments of the reasoning service lack the retrieval-index
//! document endpoint and/or job streaming. Instead of re-probing on every
//! request, the client queries `GET /v1/capabilities` once at bootstrap,
//! selects a strategy, and caches the decision for the process lifetime.

use serde::{Deserialize, Serialize};

/// How documents are made searchable by later reasoning jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStrategy {
    /// Native retrieval index: one upload call carries the purpose tag.
    RetrievalIndex,
    /// Legacy two-step: upload the raw file, then attach it by purpose.
    LegacyAttachment,
}

/// The negotiated capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiCapabilities {
    pub documents: DocumentStrategy,
    pub streaming: bool,
}

impl Default for ApiCapabilities {
    /// Conservative default used when the capabilities endpoint is absent
    /// (pre-negotiation API versions).
    fn default() -> Self {
        Self {
            documents: DocumentStrategy::LegacyAttachment,
            streaming: true,
        }
    }
}

/// Wire shape of `GET /v1/capabilities`.
#[derive(Debug, Deserialize)]
pub(crate) struct CapabilitiesResponse {
    #[serde(default)]
    pub supports_retrieval_index: bool,
    #[serde(default = "d_true")]
    pub supports_streaming: bool,
}

fn d_true() -> bool {
    true
}

impl From<CapabilitiesResponse> for ApiCapabilities {
    fn from(resp: CapabilitiesResponse) -> Self {
        Self {
            documents: if resp.supports_retrieval_index {
                DocumentStrategy::RetrievalIndex
            } else {
                DocumentStrategy::LegacyAttachment
            },
            streaming: resp.supports_streaming,
        }
    }
}
