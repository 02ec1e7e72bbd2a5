//! Turn execution: submit a user message as a remote job and wait for —
//! or stream — the assistant's reply.

pub mod guard;
pub mod instructions;
pub mod poll;

use std::sync::Arc;

use cr_assistant::types::{ContextId, JobState, MessageRole};
use cr_assistant::AssistantApi;
use cr_domain::error::{Error, Result};
use cr_domain::stream::{AssistantStreamEvent, BoxStream};
use cr_domain::trace::TraceEvent;

use guard::ensure_exclusive_access;
use instructions::{render_instructions, ContextKind};
use poll::{await_terminal, PollPolicy};

/// One conversational turn as the runtime sees it.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub message: String,
    pub context_kind: ContextKind,
}

/// Submit a turn and block until the assistant's reply is available.
///
/// Sequence: wait out in-flight jobs on the context, record the user
/// message, create the job, poll it to a terminal state, then read the
/// newest assistant message back out of the context.
pub async fn submit_and_await(
    assistant: &Arc<dyn AssistantApi>,
    ctx: &ContextId,
    turn: &TurnInput,
    policy: PollPolicy,
) -> Result<String> {
    ensure_exclusive_access(assistant, ctx, policy).await?;

    assistant
        .append_message(ctx, MessageRole::User, &turn.message)
        .await?;

    let instructions = render_instructions(&turn.context_kind);
    let job = assistant.create_job(ctx, &instructions).await?;

    let record = if job.state.is_terminal() {
        job
    } else {
        match await_terminal(|| assistant.job_status(ctx, &job.id), policy, "turn").await {
            Ok(record) => record,
            Err(err @ Error::UpstreamTimeout(_)) => {
                // The remote job keeps running; only our view of it expires.
                TraceEvent::JobStateChanged {
                    context_id: ctx.to_string(),
                    job_id: job.id.to_string(),
                    state: JobState::Expired.as_str().to_owned(),
                }
                .emit();
                return Err(err);
            }
            Err(err) => return Err(err),
        }
    };

    TraceEvent::JobStateChanged {
        context_id: ctx.to_string(),
        job_id: record.id.to_string(),
        state: record.state.as_str().to_owned(),
    }
    .emit();

    match record.state {
        JobState::Completed => latest_assistant_text(assistant, ctx).await,
        JobState::Failed => Err(Error::UpstreamFailure {
            reason: record
                .failure_reason
                .unwrap_or_else(|| "job failed without detail".to_owned()),
        }),
        JobState::Expired => Err(Error::UpstreamTimeout(
            "job expired before completing".to_owned(),
        )),
        JobState::Queued | JobState::Running => Err(Error::UpstreamFailure {
            reason: format!("job settled in non-terminal state {}", record.state.as_str()),
        }),
    }
}

/// Submit a turn and stream reply fragments as they arrive.
///
/// The yielded items are plain text chunks. Errors after the first chunk
/// cannot change the response status, so they are rendered inline as a
/// trailing `[error: ...]` marker instead.
pub async fn submit_and_stream(
    assistant: Arc<dyn AssistantApi>,
    ctx: ContextId,
    turn: TurnInput,
    policy: PollPolicy,
) -> Result<BoxStream<'static, String>> {
    ensure_exclusive_access(&assistant, &ctx, policy).await?;

    assistant
        .append_message(&ctx, MessageRole::User, &turn.message)
        .await?;

    let instructions = render_instructions(&turn.context_kind);
    let mut events = assistant.create_job_stream(&ctx, &instructions).await?;

    let stream = async_stream::stream! {
        use futures_util::StreamExt;

        while let Some(event) = events.next().await {
            match event {
                Ok(AssistantStreamEvent::Delta { text }) => yield text,
                Ok(AssistantStreamEvent::Completed) => break,
                Ok(AssistantStreamEvent::Failed { reason }) => {
                    tracing::error!(context = ctx.as_str(), reason, "stream failed");
                    yield format!("\n[error: {reason}]");
                    break;
                }
                Err(err) => {
                    tracing::error!(context = ctx.as_str(), error = %err, "stream broke");
                    yield format!("\n[error: {err}]");
                    break;
                }
            }
        }
    };

    Ok(Box::pin(stream))
}

/// Newest assistant message in the context. The remote listing is
/// newest-first, so the first assistant-role entry is the reply.
async fn latest_assistant_text(
    assistant: &Arc<dyn AssistantApi>,
    ctx: &ContextId,
) -> Result<String> {
    let messages = assistant.list_messages(ctx).await?;
    messages
        .into_iter()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.text)
        .ok_or_else(|| Error::UpstreamFailure {
            reason: "job completed but no assistant message was recorded".to_owned(),
        })
}
