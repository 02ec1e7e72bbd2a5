//! `POST /save-user-session` — persist a session summary as retrieval
//! memory. Unlike the chat endpoints this one requires a verified
//! principal: anonymous summaries would attach to a connection hash that
//! may never recur.

use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use cr_domain::error::Error;

use crate::api::chat::{api_error, error_response, request_meta};
use crate::profile::SummaryFields;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSessionRequest {
    conversation_summary: Option<String>,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    focus_areas: Vec<String>,
    #[serde(default)]
    goals: String,
    #[serde(default)]
    personal_details: String,
    #[serde(default)]
    progress: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveSessionResponse {
    success: bool,
    user_id: String,
    document_id: String,
}

pub async fn save_user_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SaveSessionRequest>,
) -> Response {
    let meta = request_meta(&headers);
    let (identity, principal) = state.fingerprints.resolve(&meta);
    let principal = match principal {
        Some(p) => p,
        None => {
            return api_error(
                StatusCode::UNAUTHORIZED,
                "a valid session token is required",
            )
        }
    };

    let conversation_summary = match req.conversation_summary {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            return error_response(Error::Validation(
                "conversationSummary is required".to_owned(),
            ))
        }
    };

    let fields = SummaryFields {
        conversation_summary,
        insights: req.insights,
        focus_areas: req.focus_areas,
        goals: req.goals,
        personal_details: req.personal_details,
        progress: req.progress,
    };

    match state.profiles.persist_summary(&identity, &fields).await {
        Ok(doc) => Json(SaveSessionResponse {
            success: true,
            user_id: principal.id,
            document_id: doc.to_string(),
        })
        .into_response(),
        Err(err) => error_response(err),
    }
}
