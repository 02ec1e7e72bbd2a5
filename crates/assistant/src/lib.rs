//! Client for the remote reasoning ("assistant") service.
//!
//! The service owns conversation contexts (durable ordered message logs),
//! asynchronous jobs against those contexts, and document storage for
//! retrieval. This crate exposes the [`AssistantApi`] trait plus a REST
//! implementation with retry and SSE streaming.

pub mod capabilities;
pub mod provider;
pub mod rest;
pub mod sse;
pub mod types;

pub use capabilities::{ApiCapabilities, DocumentStrategy};
pub use provider::AssistantApi;
pub use rest::RestAssistantClient;
pub use types::{
    ContextId, DocumentId, DocumentPurpose, JobId, JobRecord, JobState, MessageRecord, MessageRole,
};
