//! Session registry — maps session identities to durable conversation
//! contexts.
//!
//! The first request for an identity creates a context through the remote
//! service; later requests hit the cached mapping with no external call.
//! Contexts are never deleted. The mapping lives behind the injected
//! [`KeyValueStore`], so its durability is the store's concern.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use cr_assistant::{AssistantApi, ContextId};
use cr_domain::error::Result;
use cr_domain::trace::TraceEvent;

use crate::kv::KeyValueStore;

pub struct SessionRegistry {
    assistant: Arc<dyn AssistantApi>,
    contexts: Arc<dyn KeyValueStore>,
    /// Per-identity creation locks. Context creation awaits a network call,
    /// so two first requests for the same identity could otherwise both
    /// observe a miss and create twice.
    creating: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionRegistry {
    pub fn new(assistant: Arc<dyn AssistantApi>, contexts: Arc<dyn KeyValueStore>) -> Self {
        Self {
            assistant,
            contexts,
            creating: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the conversation context for an identity, creating it on
    /// first use.
    ///
    /// Guarantees: never two different contexts for the same identity
    /// within one process lifetime. Creation failure propagates and caches
    /// nothing, so a later call may retry.
    pub async fn resolve_or_create(&self, identity: &str) -> Result<ContextId> {
        // Fast path: mapping already exists.
        if let Some(id) = self.contexts.get(identity) {
            return Ok(ContextId::new(id));
        }

        let lock = {
            let mut creating = self.creating.lock();
            creating
                .entry(identity.to_owned())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        // Re-check: a concurrent request may have created while we waited.
        if let Some(id) = self.contexts.get(identity) {
            return Ok(ContextId::new(id));
        }

        let ctx = self.assistant.create_context().await?;
        self.contexts.put(identity, ctx.to_string());

        TraceEvent::SessionResolved {
            session_identity: identity.to_owned(),
            context_id: ctx.to_string(),
            is_new: true,
        }
        .emit();

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use async_trait::async_trait;
    use cr_assistant::types::{
        DocumentId, DocumentPurpose, JobId, JobRecord, MessageRecord, MessageRole,
    };
    use cr_assistant::ApiCapabilities;
    use cr_domain::error::Error;
    use cr_domain::stream::{AssistantStreamEvent, BoxStream};
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Counts context creations; optionally fails the first N of them.
    struct CountingAssistant {
        creations: AtomicU32,
        fail_first: u32,
    }

    impl CountingAssistant {
        fn new(fail_first: u32) -> Self {
            Self {
                creations: AtomicU32::new(0),
                fail_first,
            }
        }
    }

    #[async_trait]
    impl AssistantApi for CountingAssistant {
        async fn create_context(&self) -> Result<ContextId> {
            let n = self.creations.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(Error::UpstreamUnavailable("connection refused".into()));
            }
            Ok(ContextId::new(format!("ctx_{n}")))
        }

        async fn append_message(
            &self,
            _: &ContextId,
            _: MessageRole,
            _: &str,
        ) -> Result<()> {
            unimplemented!()
        }

        async fn list_messages(&self, _: &ContextId) -> Result<Vec<MessageRecord>> {
            unimplemented!()
        }

        async fn create_job(&self, _: &ContextId, _: &str) -> Result<JobRecord> {
            unimplemented!()
        }

        async fn job_status(&self, _: &ContextId, _: &JobId) -> Result<JobRecord> {
            unimplemented!()
        }

        async fn list_jobs(&self, _: &ContextId) -> Result<Vec<JobRecord>> {
            unimplemented!()
        }

        async fn create_job_stream(
            &self,
            _: &ContextId,
            _: &str,
        ) -> Result<BoxStream<'static, Result<AssistantStreamEvent>>> {
            unimplemented!()
        }

        async fn upload_document(&self, _: &str, _: DocumentPurpose) -> Result<DocumentId> {
            unimplemented!()
        }

        fn capabilities(&self) -> ApiCapabilities {
            ApiCapabilities::default()
        }
    }

    #[tokio::test]
    async fn second_call_hits_cache() {
        let assistant = Arc::new(CountingAssistant::new(0));
        let registry = SessionRegistry::new(assistant.clone(), Arc::new(MemoryStore::new()));

        let a = registry.resolve_or_create("id-1").await.unwrap();
        let b = registry.resolve_or_create("id-1").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(assistant.creations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_identities_get_distinct_contexts() {
        let assistant = Arc::new(CountingAssistant::new(0));
        let registry = SessionRegistry::new(assistant.clone(), Arc::new(MemoryStore::new()));

        let a = registry.resolve_or_create("id-1").await.unwrap();
        let b = registry.resolve_or_create("id-2").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(assistant.creations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn creation_failure_is_retryable() {
        let assistant = Arc::new(CountingAssistant::new(1));
        let registry = SessionRegistry::new(assistant.clone(), Arc::new(MemoryStore::new()));

        assert!(registry.resolve_or_create("id-1").await.is_err());
        // Nothing cached — the retry creates successfully.
        let ctx = registry.resolve_or_create("id-1").await.unwrap();
        assert_eq!(ctx.as_str(), "ctx_1");
    }

    #[tokio::test]
    async fn concurrent_first_calls_create_once() {
        let assistant = Arc::new(CountingAssistant::new(0));
        let registry = Arc::new(SessionRegistry::new(
            assistant.clone(),
            Arc::new(MemoryStore::new()),
        ));

        let r1 = registry.clone();
        let r2 = registry.clone();
        let (a, b) = tokio::join!(
            r1.resolve_or_create("id-1"),
            r2.resolve_or_create("id-1"),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(assistant.creations.load(Ordering::SeqCst), 1);
    }
}
