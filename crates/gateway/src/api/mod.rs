pub mod chat;
pub mod profile;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// `/chat` and `/chat-stream` are public: a bad or missing token degrades
/// to an anonymous session instead of rejecting. `/save-user-session`
/// requires a verified principal.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat", post(chat::chat))
        .route("/chat-stream", post(chat::chat_stream))
        .route("/save-user-session", post(profile::save_user_session))
}

async fn healthz() -> &'static str {
    "ok"
}
