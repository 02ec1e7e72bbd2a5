//! Shared test fixtures: a scriptable in-memory assistant service and an
//! app builder wired the same way as production bootstrap.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;

use cr_assistant::types::{
    ContextId, DocumentId, DocumentPurpose, JobId, JobRecord, JobState, MessageRecord,
    MessageRole,
};
use cr_assistant::{ApiCapabilities, AssistantApi};
use cr_domain::config::Config;
use cr_domain::error::Result;
use cr_domain::stream::{AssistantStreamEvent, BoxStream};
use cr_gateway::api;
use cr_gateway::profile::ProfileWriter;
use cr_gateway::state::AppState;
use cr_sessions::{FingerprintResolver, MemoryStore, SessionRegistry, TokenCodec};

/// A scriptable stand-in for the remote reasoning service.
///
/// `polls_until_complete` controls how many status fetches a job needs
/// before it reports terminal; `u32::MAX` means it never settles.
pub struct MockAssistant {
    pub reply: String,
    pub polls_until_complete: u32,
    pub fail_reason: Option<String>,
    pub stream_events: Vec<AssistantStreamEvent>,
    pub contexts_created: AtomicU32,
    pub status_calls: AtomicU32,
    pub uploads: AtomicU32,
    pub appended: Mutex<Vec<(MessageRole, String)>>,
}

impl Default for MockAssistant {
    fn default() -> Self {
        Self {
            reply: "You are not stuck, you are gathering momentum.".to_owned(),
            polls_until_complete: 3,
            fail_reason: None,
            stream_events: vec![
                AssistantStreamEvent::Delta {
                    text: "You are ".to_owned(),
                },
                AssistantStreamEvent::Delta {
                    text: "doing fine.".to_owned(),
                },
                AssistantStreamEvent::Completed,
            ],
            contexts_created: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            uploads: AtomicU32::new(0),
            appended: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AssistantApi for MockAssistant {
    async fn create_context(&self) -> Result<ContextId> {
        let n = self.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(ContextId::new(format!("ctx_{n}")))
    }

    async fn append_message(&self, _: &ContextId, role: MessageRole, text: &str) -> Result<()> {
        self.appended.lock().push((role, text.to_owned()));
        Ok(())
    }

    async fn list_messages(&self, _: &ContextId) -> Result<Vec<MessageRecord>> {
        // Newest-first, like the real service.
        let mut out = vec![MessageRecord {
            id: "msg_reply".to_owned(),
            role: MessageRole::Assistant,
            text: self.reply.clone(),
        }];
        for (i, (role, text)) in self.appended.lock().iter().enumerate().rev() {
            out.push(MessageRecord {
                id: format!("msg_{i}"),
                role: *role,
                text: text.clone(),
            });
        }
        Ok(out)
    }

    async fn create_job(&self, _: &ContextId, _: &str) -> Result<JobRecord> {
        Ok(JobRecord {
            id: JobId::new("job_1"),
            state: JobState::Queued,
            failure_reason: None,
        })
    }

    async fn job_status(&self, _: &ContextId, id: &JobId) -> Result<JobRecord> {
        let n = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let (state, failure_reason) = if n < self.polls_until_complete {
            (if n == 1 { JobState::Queued } else { JobState::Running }, None)
        } else if let Some(reason) = &self.fail_reason {
            (JobState::Failed, Some(reason.clone()))
        } else {
            (JobState::Completed, None)
        };
        Ok(JobRecord {
            id: id.clone(),
            state,
            failure_reason,
        })
    }

    async fn list_jobs(&self, _: &ContextId) -> Result<Vec<JobRecord>> {
        Ok(Vec::new())
    }

    async fn create_job_stream(
        &self,
        _: &ContextId,
        _: &str,
    ) -> Result<BoxStream<'static, Result<AssistantStreamEvent>>> {
        let events: Vec<Result<AssistantStreamEvent>> =
            self.stream_events.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures_util::stream::iter(events)))
    }

    async fn upload_document(&self, _: &str, _: DocumentPurpose) -> Result<DocumentId> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(DocumentId::new(format!("doc_{n}")))
    }

    fn capabilities(&self) -> ApiCapabilities {
        ApiCapabilities::default()
    }
}

/// Assemble the router exactly like production bootstrap, with the mock
/// in place of the REST client.
pub fn app(mock: Arc<MockAssistant>, secret: Option<&str>, poll_max_attempts: u32) -> Router {
    let mut config = Config::default();
    config.assistant.poll_max_attempts = poll_max_attempts;

    let assistant: Arc<dyn AssistantApi> = mock;
    let state = AppState {
        config: Arc::new(config),
        assistant: assistant.clone(),
        fingerprints: Arc::new(FingerprintResolver::new(secret.map(TokenCodec::new))),
        registry: Arc::new(SessionRegistry::new(
            assistant.clone(),
            Arc::new(MemoryStore::new()),
        )),
        profiles: Arc::new(ProfileWriter::new(assistant, Arc::new(MemoryStore::new()))),
    };

    api::router().with_state(state)
}
