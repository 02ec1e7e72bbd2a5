//! Chat endpoints.
//!
//! - `POST /chat`        — submit a message, wait for the full reply
//! - `POST /chat-stream` — submit a message, stream the reply as plain text
//!
//! Both accept an optional bearer token; a bad token degrades to an
//! anonymous session rather than rejecting.

use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use cr_domain::error::Error;
use cr_sessions::RequestMeta;

use crate::runtime::instructions::ContextKind;
use crate::runtime::{submit_and_await, submit_and_stream, TurnInput};
use crate::state::AppState;

/// The message shown to callers for any upstream fault. Deliberately
/// carries no remote detail.
const GENERIC_UPSTREAM_ERROR: &str = "Something went wrong. Please try again.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct ChatRequest {
    /// Optional so that a missing field yields our 400, not a serde 422.
    message: Option<String>,
    context: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    message: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Map a domain error to the client-facing response. Everything except
/// validation is collapsed into one generic message; the detail goes to
/// the log only. Caller auth never reaches here — a bad token degrades to
/// anonymous, and the save endpoint mints its own 401.
pub(crate) fn error_response(err: Error) -> Response {
    match err {
        Error::Validation(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        other => {
            tracing::error!(error = %other, "request failed upstream");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_UPSTREAM_ERROR)
        }
    }
}

/// Extract the metadata the fingerprint resolver hashes. The remote address
/// comes from `x-forwarded-for` (first hop) since the service runs behind a
/// proxy; absent that, a fixed placeholder keeps local calls stable.
pub(crate) fn request_meta(headers: &HeaderMap) -> RequestMeta {
    let text_header = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    };

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);

    let remote_addr = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned())
        .unwrap_or_else(|| "local".to_owned());

    RequestMeta {
        bearer,
        remote_addr,
        user_agent: text_header(header::USER_AGENT),
        accept_language: text_header(header::ACCEPT_LANGUAGE),
        accept_encoding: text_header(header::ACCEPT_ENCODING),
    }
}

fn validate_message(message: Option<String>) -> Result<String, Response> {
    match message {
        Some(m) if !m.trim().is_empty() => Ok(m),
        _ => Err(error_response(Error::Validation(
            "message is required".to_owned(),
        ))),
    }
}

async fn resolve_turn(
    state: &AppState,
    headers: &HeaderMap,
    req: ChatRequest,
) -> Result<(cr_assistant::ContextId, TurnInput), Response> {
    let message = validate_message(req.message)?;

    let meta = request_meta(headers);
    let (identity, _principal) = state.fingerprints.resolve(&meta);

    let ctx = state
        .registry
        .resolve_or_create(&identity)
        .await
        .map_err(error_response)?;

    let turn = TurnInput {
        message,
        context_kind: ContextKind::from_request_field(req.context.as_deref()),
    };
    Ok((ctx, turn))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Response {
    let (ctx, turn) = match resolve_turn(&state, &headers, req).await {
        Ok(resolved) => resolved,
        Err(resp) => return resp,
    };

    match submit_and_await(&state.assistant, &ctx, &turn, state.poll_policy()).await {
        Ok(message) => Json(ChatResponse { message }).into_response(),
        Err(err) => error_response(err),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /chat-stream
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Same input as `/chat`, but the reply is a chunked plain-text body.
/// Errors before the first chunk use the normal error envelope; after
/// that, the stream itself carries an inline `[error: ...]` marker.
pub async fn chat_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Response {
    let (ctx, turn) = match resolve_turn(&state, &headers, req).await {
        Ok(resolved) => resolved,
        Err(resp) => return resp,
    };

    let stream = match submit_and_stream(
        state.assistant.clone(),
        ctx,
        turn,
        state.poll_policy(),
    )
    .await
    {
        Ok(stream) => stream,
        Err(err) => return error_response(err),
    };

    let body = Body::from_stream(stream.map(Ok::<_, std::convert::Infallible>));
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
