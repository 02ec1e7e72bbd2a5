//! End-to-end tests for `POST /save-user-session`.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use tower::util::ServiceExt;

use cr_sessions::{Claims, TokenCodec};
use support::MockAssistant;

fn save_request(body: serde_json::Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/save-user-session")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_token(secret: &str) -> String {
    TokenCodec::new(secret)
        .sign(&Claims {
            principal_id: "u42".into(),
            principal_email: "alice@example.com".into(),
            session_fingerprint: None,
            exp: Utc::now().timestamp() + 3600,
        })
        .unwrap()
}

#[tokio::test]
async fn save_requires_verified_principal() {
    let app = support::app(Arc::new(MockAssistant::default()), Some("test-secret"), 60);

    let response = app
        .oneshot(save_request(
            serde_json::json!({ "conversationSummary": "We talked." }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn save_requires_summary() {
    let token = valid_token("test-secret");
    let app = support::app(Arc::new(MockAssistant::default()), Some("test-secret"), 60);

    let response = app
        .oneshot(save_request(serde_json::json!({}), Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "conversationSummary is required"
    );
}

#[tokio::test]
async fn save_round_trip() {
    let token = valid_token("test-secret");
    let mock = Arc::new(MockAssistant::default());
    let app = support::app(mock.clone(), Some("test-secret"), 60);

    let response = app
        .oneshot(save_request(
            serde_json::json!({
                "conversationSummary": "We worked on boundaries.",
                "insights": ["Spots the pattern quickly"],
                "focusAreas": ["work"],
                "goals": "Say no once this week",
            }),
            Some(&token),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["userId"], "u42");
    assert_eq!(body["documentId"], "doc_0");
    assert_eq!(mock.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_save_uploads_again() {
    let token = valid_token("test-secret");
    let mock = Arc::new(MockAssistant::default());
    let app = support::app(mock.clone(), Some("test-secret"), 60);

    for expected in ["doc_0", "doc_1"] {
        let response = app
            .clone()
            .oneshot(save_request(
                serde_json::json!({ "conversationSummary": "Again." }),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["documentId"], expected);
    }

    assert_eq!(mock.uploads.load(Ordering::SeqCst), 2);
}
