//! Profile memory writer.
//!
//! Renders a session summary into a fixed human-readable document, uploads
//! it to the assistant service as retrieval-eligible memory, and records
//! the returned document id against the session identity. Saving again
//! overwrites the mapping; the earlier document stays on the remote side.

use std::fmt::Write as _;
use std::sync::Arc;

use cr_assistant::types::{DocumentId, DocumentPurpose};
use cr_assistant::AssistantApi;
use cr_domain::error::Result;
use cr_domain::trace::TraceEvent;
use cr_sessions::KeyValueStore;

/// The summary a client submits at the end of a session.
#[derive(Debug, Clone, Default)]
pub struct SummaryFields {
    pub conversation_summary: String,
    pub insights: Vec<String>,
    pub focus_areas: Vec<String>,
    pub goals: String,
    pub personal_details: String,
    pub progress: String,
}

pub struct ProfileWriter {
    assistant: Arc<dyn AssistantApi>,
    documents: Arc<dyn KeyValueStore>,
}

impl ProfileWriter {
    pub fn new(assistant: Arc<dyn AssistantApi>, documents: Arc<dyn KeyValueStore>) -> Self {
        Self {
            assistant,
            documents,
        }
    }

    /// Render and upload the summary, then map `identity` to the new
    /// document id, replacing any previous mapping. Upload failure
    /// propagates and leaves the prior mapping untouched.
    pub async fn persist_summary(
        &self,
        identity: &str,
        fields: &SummaryFields,
    ) -> Result<DocumentId> {
        let rendered = render_summary(fields);
        let doc = self
            .assistant
            .upload_document(&rendered, DocumentPurpose::Retrieval)
            .await?;

        self.documents.put(identity, doc.to_string());

        TraceEvent::ProfileSaved {
            session_identity: identity.to_owned(),
            document_id: doc.to_string(),
        }
        .emit();

        Ok(doc)
    }

    /// The current document id for an identity, if one was saved.
    pub fn current_document(&self, identity: &str) -> Option<String> {
        self.documents.get(identity)
    }
}

fn render_summary(fields: &SummaryFields) -> String {
    let mut out = String::new();
    out.push_str("# Session profile\n\n");

    out.push_str("## Conversation summary\n");
    out.push_str(fields.conversation_summary.trim());
    out.push_str("\n\n");

    if !fields.insights.is_empty() {
        out.push_str("## Insights\n");
        for insight in &fields.insights {
            let _ = writeln!(out, "- {}", insight.trim());
        }
        out.push('\n');
    }

    if !fields.focus_areas.is_empty() {
        out.push_str("## Focus areas\n");
        for area in &fields.focus_areas {
            let _ = writeln!(out, "- {}", area.trim());
        }
        out.push('\n');
    }

    for (heading, body) in [
        ("## Goals\n", &fields.goals),
        ("## Personal details\n", &fields.personal_details),
        ("## Progress\n", &fields.progress),
    ] {
        if !body.trim().is_empty() {
            out.push_str(heading);
            out.push_str(body.trim());
            out.push_str("\n\n");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cr_assistant::types::{
        ContextId, JobId, JobRecord, MessageRecord, MessageRole,
    };
    use cr_assistant::ApiCapabilities;
    use cr_domain::stream::{AssistantStreamEvent, BoxStream};
    use cr_sessions::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct RecordingUploader {
        uploads: AtomicU32,
    }

    #[async_trait]
    impl AssistantApi for RecordingUploader {
        async fn create_context(&self) -> Result<ContextId> {
            unimplemented!()
        }

        async fn append_message(&self, _: &ContextId, _: MessageRole, _: &str) -> Result<()> {
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
            let n = self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(DocumentId::new(format!("doc_{n}")))
        }

        fn capabilities(&self) -> ApiCapabilities {
            ApiCapabilities::default()
        }
    }

    fn fields(summary: &str) -> SummaryFields {
        SummaryFields {
            conversation_summary: summary.to_owned(),
            ..SummaryFields::default()
        }
    }

    #[tokio::test]
    async fn second_save_overwrites_mapping_with_two_uploads() {
        let assistant = Arc::new(RecordingUploader {
            uploads: AtomicU32::new(0),
        });
        let writer = ProfileWriter::new(assistant.clone(), Arc::new(MemoryStore::new()));

        writer.persist_summary("id-1", &fields("first")).await.unwrap();
        let second = writer.persist_summary("id-1", &fields("second")).await.unwrap();

        assert_eq!(writer.current_document("id-1").as_deref(), Some(second.as_str()));
        assert_eq!(assistant.uploads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn render_includes_sections_and_skips_empty_ones() {
        let rendered = render_summary(&SummaryFields {
            conversation_summary: "We talked about boundaries.".to_owned(),
            insights: vec!["Names the pattern quickly".to_owned()],
            focus_areas: vec![],
            goals: "Say no once this week".to_owned(),
            personal_details: String::new(),
            progress: String::new(),
        });

        assert!(rendered.contains("## Conversation summary"));
        assert!(rendered.contains("We talked about boundaries."));
        assert!(rendered.contains("- Names the pattern quickly"));
        assert!(rendered.contains("## Goals"));
        assert!(!rendered.contains("## Focus areas"));
        assert!(!rendered.contains("## Personal details"));
    }
}
