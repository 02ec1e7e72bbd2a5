//! REST implementation of [`AssistantApi`].
//!
//! `RestAssistantClient` wraps a `reqwest::Client` and translates every
//! trait method into the corresponding HTTP call against the reasoning
//! service, with automatic retry + exponential back-off on transient
//! (5xx / transport) failures. Capabilities are negotiated once at
//! bootstrap and cached for the process lifetime.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use cr_domain::config::AssistantConfig;
use cr_domain::error::{Error, Result};
use cr_domain::stream::{AssistantStreamEvent, BoxStream};
use cr_domain::trace::TraceEvent;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use uuid::Uuid;

use crate::capabilities::{ApiCapabilities, CapabilitiesResponse, DocumentStrategy};
use crate::provider::AssistantApi;
use crate::sse::job_event_stream;
use crate::types::{
    ContextId, DocumentId, DocumentPurpose, JobId, JobRecord, MessageRecord, MessageRole,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST-based client for the remote reasoning service.
///
/// Created once and reused for the lifetime of the process. The underlying
/// `reqwest::Client` maintains a connection pool.
#[derive(Debug)]
pub struct RestAssistantClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    caps: RwLock<ApiCapabilities>,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    jobs: Vec<JobRecord>,
}

impl RestAssistantClient {
    /// Build a new client from the shared `AssistantConfig`. The API key is
    /// read once from the env var named by `api_key_env`.
    pub fn new(cfg: &AssistantConfig) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %cfg.api_key_env,
                "assistant API key env var unset — requests will be unauthenticated"
            );
        }

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key,
            max_retries: cfg.max_retries,
            caps: RwLock::new(ApiCapabilities::default()),
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let trace_id = Uuid::new_v4().to_string();
        let mut rb = rb
            .header("X-Client-Type", "coachrelay")
            .header("X-Trace-Id", &trace_id);

        if let Some(ref key) = self.api_key {
            rb = rb.bearer_auth(key);
        }
        rb
    }

    /// Build the full URL for a path like `/v1/contexts`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with retry + exponential back-off on transient errors.
    ///
    /// * Retries on 5xx status codes and on transport errors/timeouts.
    /// * Does **not** retry on 4xx (client errors are permanent).
    /// * Emits a `TraceEvent::AssistantCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let rb = self.decorate(build_request());
            let result = rb.send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    TraceEvent::AssistantCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_server_error() {
                        // 5xx — transient, retry
                        let body = resp.text().await.unwrap_or_default();
                        last_err = Some(Error::UpstreamUnavailable(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                        continue;
                    }

                    if resp.status().is_client_error() {
                        // 4xx — permanent, do NOT retry
                        let resp_status = resp.status();
                        let body = resp.text().await.unwrap_or_default();
                        if resp_status == StatusCode::UNAUTHORIZED
                            || resp_status == StatusCode::FORBIDDEN
                        {
                            return Err(Error::Auth(format!(
                                "{endpoint} auth failed ({status}): {body}"
                            )));
                        }
                        return Err(Error::Http(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    let status = e.status().map(|s| s.as_u16()).unwrap_or(0);

                    TraceEvent::AssistantCall {
                        endpoint: endpoint.to_owned(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    last_err = Some(Error::UpstreamUnavailable(e.to_string()));
                    // Timeouts and connection errors are transient — retry
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::UpstreamUnavailable(format!("{endpoint}: all retries exhausted"))))
    }

    /// Read and parse a JSON response body.
    async fn parse_json<T: serde::de::DeserializeOwned>(
        endpoint: &str,
        resp: Response,
    ) -> Result<T> {
        let body = resp
            .text()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| {
            Error::UpstreamUnavailable(format!("failed to parse {endpoint} response: {e}: {body}"))
        })
    }

    // ── capability negotiation ───────────────────────────────────────

    /// Query `GET /v1/capabilities` and cache the decision. Called once at
    /// bootstrap; a missing endpoint (404) falls back to the conservative
    /// default rather than failing startup.
    pub async fn negotiate_capabilities(&self) -> Result<ApiCapabilities> {
        let url = self.url("/v1/capabilities");
        let negotiated = match self
            .execute_with_retry("GET /v1/capabilities", || self.http.get(&url))
            .await
        {
            Ok(resp) => {
                let wire: CapabilitiesResponse =
                    Self::parse_json("GET /v1/capabilities", resp).await?;
                ApiCapabilities::from(wire)
            }
            Err(Error::Http(_)) => {
                tracing::info!("capabilities endpoint not available, using defaults");
                ApiCapabilities::default()
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            documents = ?negotiated.documents,
            streaming = negotiated.streaming,
            "assistant capabilities negotiated"
        );
        *self.caps.write() = negotiated;
        Ok(negotiated)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl AssistantApi for RestAssistantClient {
    async fn create_context(&self) -> Result<ContextId> {
        let url = self.url("/v1/contexts");
        let resp = self
            .execute_with_retry("POST /v1/contexts", || self.http.post(&url))
            .await?;
        let body: IdResponse = Self::parse_json("POST /v1/contexts", resp).await?;
        Ok(ContextId::new(body.id))
    }

    async fn append_message(
        &self,
        ctx: &ContextId,
        role: MessageRole,
        text: &str,
    ) -> Result<()> {
        let url = self.url(&format!("/v1/contexts/{ctx}/messages"));
        let payload = serde_json::json!({ "role": role, "text": text });
        self.execute_with_retry("POST /v1/contexts/:id/messages", || {
            self.http.post(&url).json(&payload)
        })
        .await?;
        Ok(())
    }

    async fn list_messages(&self, ctx: &ContextId) -> Result<Vec<MessageRecord>> {
        let url = self.url(&format!("/v1/contexts/{ctx}/messages"));
        let resp = self
            .execute_with_retry("GET /v1/contexts/:id/messages", || self.http.get(&url))
            .await?;
        let body: MessagesResponse =
            Self::parse_json("GET /v1/contexts/:id/messages", resp).await?;
        Ok(body.messages)
    }

    async fn create_job(&self, ctx: &ContextId, instructions: &str) -> Result<JobRecord> {
        let url = self.url(&format!("/v1/contexts/{ctx}/jobs"));
        let payload = serde_json::json!({ "instructions": instructions });
        let resp = self
            .execute_with_retry("POST /v1/contexts/:id/jobs", || {
                self.http.post(&url).json(&payload)
            })
            .await?;
        Self::parse_json("POST /v1/contexts/:id/jobs", resp).await
    }

    async fn job_status(&self, ctx: &ContextId, job: &JobId) -> Result<JobRecord> {
        let url = self.url(&format!("/v1/contexts/{ctx}/jobs/{job}"));
        let resp = self
            .execute_with_retry("GET /v1/contexts/:id/jobs/:jid", || self.http.get(&url))
            .await?;
        Self::parse_json("GET /v1/contexts/:id/jobs/:jid", resp).await
    }

    async fn list_jobs(&self, ctx: &ContextId) -> Result<Vec<JobRecord>> {
        let url = self.url(&format!("/v1/contexts/{ctx}/jobs"));
        let resp = self
            .execute_with_retry("GET /v1/contexts/:id/jobs", || self.http.get(&url))
            .await?;
        let body: JobsResponse = Self::parse_json("GET /v1/contexts/:id/jobs", resp).await?;
        Ok(body.jobs)
    }

    async fn create_job_stream(
        &self,
        ctx: &ContextId,
        instructions: &str,
    ) -> Result<BoxStream<'static, Result<AssistantStreamEvent>>> {
        // No retry here: once the event stream is open, bytes may already
        // have been consumed, so a replay could duplicate output.
        let url = self.url(&format!("/v1/contexts/{ctx}/jobs"));
        let payload = serde_json::json!({ "instructions": instructions, "stream": true });

        let resp = self
            .decorate(self.http.post(&url).json(&payload))
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::UpstreamUnavailable(format!(
                "job stream returned {status}: {body}"
            )));
        }

        Ok(job_event_stream(resp))
    }

    async fn upload_document(&self, text: &str, purpose: DocumentPurpose) -> Result<DocumentId> {
        // Copy the strategy out so the lock guard is not held across awaits.
        let strategy = self.caps.read().documents;
        match strategy {
            DocumentStrategy::RetrievalIndex => {
                let url = self.url("/v1/documents");
                let payload =
                    serde_json::json!({ "content": text, "purpose": purpose.as_str() });
                let resp = self
                    .execute_with_retry("POST /v1/documents", || {
                        self.http.post(&url).json(&payload)
                    })
                    .await?;
                let body: IdResponse = Self::parse_json("POST /v1/documents", resp).await?;
                Ok(DocumentId::new(body.id))
            }
            DocumentStrategy::LegacyAttachment => {
                // Two-step: upload the raw file, then attach it by purpose.
                let upload_url = self.url("/v1/files");
                let payload = serde_json::json!({ "content": text });
                let resp = self
                    .execute_with_retry("POST /v1/files", || {
                        self.http.post(&upload_url).json(&payload)
                    })
                    .await?;
                let body: IdResponse = Self::parse_json("POST /v1/files", resp).await?;

                let attach_url = self.url(&format!("/v1/files/{}/attach", body.id));
                let attach_payload = serde_json::json!({ "purpose": purpose.as_str() });
                self.execute_with_retry("POST /v1/files/:id/attach", || {
                    self.http.post(&attach_url).json(&attach_payload)
                })
                .await?;

                Ok(DocumentId::new(body.id))
            }
        }
    }

    fn capabilities(&self) -> ApiCapabilities {
        *self.caps.read()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
