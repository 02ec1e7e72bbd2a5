//! Generic "await terminal state" primitive.
//!
//! One polling discipline is shared by run submission and the concurrency
//! guard: fetch the job state at a fixed interval, up to a hard attempt
//! ceiling. The sleep is an ordinary `tokio::time::sleep` future, so the
//! whole wait is dropped (cancelled) with the caller.

use std::future::Future;
use std::time::Duration;

use cr_assistant::types::JobRecord;
use cr_domain::config::AssistantConfig;
use cr_domain::error::{Error, Result};

/// Fixed-interval polling policy.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Hard ceiling on status fetches. Exactly this many fetches are
    /// performed before giving up.
    pub max_attempts: u32,
}

impl From<&AssistantConfig> for PollPolicy {
    fn from(cfg: &AssistantConfig) -> Self {
        Self {
            interval: Duration::from_millis(cfg.poll_interval_ms),
            max_attempts: cfg.poll_max_attempts,
        }
    }
}

/// Poll `fetch` until it reports a terminal job state.
///
/// Performs at most `policy.max_attempts` fetches, sleeping
/// `policy.interval` between them. Fetch errors propagate immediately.
/// When the ceiling is exceeded the caller gives up with an
/// `UpstreamTimeout` — the remote job is not cancelled and may still
/// finish (its state is locally "expired").
pub async fn await_terminal<F, Fut>(
    mut fetch: F,
    policy: PollPolicy,
    label: &str,
) -> Result<JobRecord>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<JobRecord>>,
{
    for attempt in 1..=policy.max_attempts {
        let record = fetch().await?;
        if record.state.is_terminal() {
            return Ok(record);
        }

        if attempt % 10 == 0 {
            tracing::debug!(
                label,
                attempt,
                state = record.state.as_str(),
                "still waiting for terminal state"
            );
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(Error::UpstreamTimeout(format!(
        "{label}: no terminal state after {} status checks",
        policy.max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_assistant::types::{JobId, JobState};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record(state: JobState) -> JobRecord {
        JobRecord {
            id: JobId::new("job_1"),
            state,
            failure_reason: None,
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_on_first_fetch() {
        let calls = AtomicU32::new(0);
        let result = await_terminal(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(record(JobState::Completed)) }
            },
            policy(60),
            "test",
        )
        .await
        .unwrap();
        assert_eq!(result.state, JobState::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flips_after_n_polls() {
        let calls = AtomicU32::new(0);
        let result = await_terminal(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 4 {
                        Ok(record(JobState::Running))
                    } else {
                        Ok(record(JobState::Completed))
                    }
                }
            },
            policy(60),
            "test",
        )
        .await
        .unwrap();
        assert_eq!(result.state, JobState::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_produces_timeout_with_exact_check_count() {
        let calls = AtomicU32::new(0);
        let err = await_terminal(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(record(JobState::Running)) }
            },
            policy(60),
            "test",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UpstreamTimeout(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let err = await_terminal(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::UpstreamUnavailable("boom".into())) }
            },
            policy(60),
            "test",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
