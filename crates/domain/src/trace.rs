use serde::Serialize;

/// Structured trace events emitted across all CoachRelay crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        session_identity: String,
        context_id: String,
        is_new: bool,
    },
    FingerprintDowngraded {
        reason: String,
    },
    AssistantCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    JobStateChanged {
        context_id: String,
        job_id: String,
        state: String,
    },
    ProfileSaved {
        session_identity: String,
        document_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cr_event");
    }
}
