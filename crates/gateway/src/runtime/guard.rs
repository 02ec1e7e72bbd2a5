//! Concurrency guard for a conversation context.
//!
//! The remote service rejects a new job while another one is live on the
//! same context, so before submitting we list the context's jobs and wait
//! out any that are still in flight. The check is advisory: between the
//! final status fetch and our own submission another request can slip in.
//! That window is accepted — the remote side still enforces the real
//! invariant and the submission surfaces its rejection.

use std::sync::Arc;

use cr_assistant::types::ContextId;
use cr_assistant::AssistantApi;
use cr_domain::error::Result;

use super::poll::{await_terminal, PollPolicy};

/// Wait until no job on `ctx` is in a non-terminal state.
pub async fn ensure_exclusive_access(
    assistant: &Arc<dyn AssistantApi>,
    ctx: &ContextId,
    policy: PollPolicy,
) -> Result<()> {
    let jobs = assistant.list_jobs(ctx).await?;

    for job in jobs.into_iter().filter(|j| !j.state.is_terminal()) {
        tracing::debug!(
            context = ctx.as_str(),
            job = job.id.as_str(),
            state = job.state.as_str(),
            "waiting for in-flight job before submitting"
        );
        await_terminal(
            || assistant.job_status(ctx, &job.id),
            policy,
            "concurrency guard",
        )
        .await?;
    }

    Ok(())
}
