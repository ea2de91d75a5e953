// tests/http_api.rs
// Handler-level API tests driven through tower's oneshot, covering auth,
// ownership scoping, CRUD, and the turn endpoint's error mapping.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

use common::{memory_pool, openai_keys, seed_user, spawn_stub_provider, test_state};
use switchboard::api_router;
use switchboard::llm::ProviderKeys;

async fn test_app(default_keys: ProviderKeys) -> Router {
    let pool = memory_pool().await;
    seed_user(&pool, "alice", "tok-alice").await;
    seed_user(&pool, "mallory", "tok-mallory").await;

    let base = spawn_stub_provider(Duration::ZERO).await;
    let state = test_state(pool, &base, default_keys, Duration::from_secs(5), "./uploads");
    api_router(state)
}

fn authed(token: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn requests_without_a_session_are_rejected() {
    let app = test_app(openai_keys()).await;

    let response = app
        .oneshot(Request::builder().uri("/api/chats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("sign in"));
}

#[tokio::test]
async fn stale_tokens_are_rejected() {
    let app = test_app(openai_keys()).await;

    let response = app
        .oneshot(authed("tok-nobody", "GET", "/api/chats", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn chats_can_be_created_listed_renamed_and_deleted() {
    let app = test_app(openai_keys()).await;

    // Create
    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "POST",
            "/api/chats",
            Some(json!({ "model": "gpt-4" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chat = json_body(response).await;
    let chat_id = chat["id"].as_str().unwrap().to_string();
    assert_eq!(chat["title"], "New Chat");
    assert_eq!(chat["messageCount"], 0);

    // List
    let response = app
        .clone()
        .oneshot(authed("tok-alice", "GET", "/api/chats", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let chats = json_body(response).await;
    assert_eq!(chats.as_array().unwrap().len(), 1);

    // Rename
    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "PATCH",
            &format!("/api/chats/{chat_id}"),
            Some(json!({ "title": "Trip planning" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["title"], "Trip planning");

    // Delete
    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "DELETE",
            &format!("/api/chats/{chat_id}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed("tok-alice", "GET", "/api/chats", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn messages_are_scoped_to_the_owner() {
    let app = test_app(openai_keys()).await;

    let response = app
        .clone()
        .oneshot(authed("tok-alice", "POST", "/api/chats", Some(json!({}))))
        .await
        .unwrap();
    let chat_id = json_body(response).await["id"].as_str().unwrap().to_string();

    // Owner writes and reads fine.
    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "POST",
            &format!("/api/chats/{chat_id}/messages"),
            Some(json!({ "content": "hello", "role": "user" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "GET",
            &format!("/api/chats/{chat_id}/messages"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

    // A stranger sees 404, not 403: the chat's existence stays private.
    for (method, uri, body) in [
        ("GET", format!("/api/chats/{chat_id}/messages"), None),
        (
            "POST",
            format!("/api/chats/{chat_id}/messages"),
            Some(json!({ "content": "hi", "role": "user" })),
        ),
        ("DELETE", format!("/api/chats/{chat_id}"), None),
    ] {
        let response = app
            .clone()
            .oneshot(authed("tok-mallory", method, &uri, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn turn_endpoint_rejects_unknown_models() {
    let app = test_app(openai_keys()).await;

    let response = app
        .clone()
        .oneshot(authed("tok-alice", "POST", "/api/chats", Some(json!({}))))
        .await
        .unwrap();
    let chat_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(authed(
            "tok-alice",
            "POST",
            "/api/chat",
            Some(json!({
                "chatId": chat_id,
                "message": "hello",
                "model": "llama-70b"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("Unsupported model"));
}

#[tokio::test]
async fn turn_endpoint_reports_missing_keys_as_400() {
    // No server-side default keys configured.
    let app = test_app(ProviderKeys::default()).await;

    let response = app
        .clone()
        .oneshot(authed("tok-alice", "POST", "/api/chats", Some(json!({}))))
        .await
        .unwrap();
    let chat_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "POST",
            "/api/chat",
            Some(json!({
                "chatId": chat_id,
                "message": "picture of a red bicycle",
                "model": "gpt-4"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("API key not configured"));

    // The rejected turn left no trace in the chat.
    let response = app
        .oneshot(authed(
            "tok-alice",
            "GET",
            &format!("/api/chats/{chat_id}/messages"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn turn_endpoint_completes_a_chat_turn() {
    let app = test_app(openai_keys()).await;

    let response = app
        .clone()
        .oneshot(authed("tok-alice", "POST", "/api/chats", Some(json!({}))))
        .await
        .unwrap();
    let chat_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            "tok-alice",
            "POST",
            "/api/chat",
            Some(json!({
                "chatId": chat_id,
                "message": "Tell me about Rust",
                "model": "gpt-4"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["content"], common::STUB_CHAT_REPLY);
    assert_eq!(body["model"], "gpt-4");

    // Turn against a chat the caller does not own: 404.
    let response = app
        .oneshot(authed(
            "tok-mallory",
            "POST",
            "/api/chat",
            Some(json!({
                "chatId": chat_id,
                "message": "hello",
                "model": "gpt-4"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = test_app(openai_keys()).await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
