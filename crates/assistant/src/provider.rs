//! The `AssistantApi` trait defines the interface to the remote reasoning
//! service (REST, or a test double).

use async_trait::async_trait;
use cr_domain::error::Result;
use cr_domain::stream::{AssistantStreamEvent, BoxStream};

use crate::capabilities::ApiCapabilities;
use crate::types::{
    ContextId, DocumentId, DocumentPurpose, JobRecord, JobId, MessageRecord, MessageRole,
};

/// Abstraction over the remote reasoning service API surface.
///
/// Implementations may talk to the real REST API or a test double.
/// All methods return `cr_domain::error::Result`.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create a new durable conversation context.
    async fn create_context(&self) -> Result<ContextId>;

    /// Append one message to a context. Server receipt order is the
    /// authoritative message order.
    async fn append_message(
        &self,
        ctx: &ContextId,
        role: MessageRole,
        text: &str,
    ) -> Result<()>;

    /// List the context's messages, ordered newest-first.
    async fn list_messages(&self, ctx: &ContextId) -> Result<Vec<MessageRecord>>;

    /// Start an asynchronous job against a context. `instructions` is a
    /// free-text hint for the remote reasoning system, not parsed locally.
    async fn create_job(&self, ctx: &ContextId, instructions: &str) -> Result<JobRecord>;

    /// Fetch the current state of one job.
    async fn job_status(&self, ctx: &ContextId, job: &JobId) -> Result<JobRecord>;

    /// List all jobs known for a context.
    async fn list_jobs(&self, ctx: &ContextId) -> Result<Vec<JobRecord>>;

    /// Streaming variant of `create_job`: yields incremental text deltas
    /// and a terminal event.
    async fn create_job_stream(
        &self,
        ctx: &ContextId,
        instructions: &str,
    ) -> Result<BoxStream<'static, Result<AssistantStreamEvent>>>;

    /// Upload a text document to the remote document store.
    async fn upload_document(&self, text: &str, purpose: DocumentPurpose) -> Result<DocumentId>;

    /// The capability set negotiated once at startup.
    fn capabilities(&self) -> ApiCapabilities;
}
