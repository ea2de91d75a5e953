// tests/common/mod.rs
// Shared wiring for integration tests: in-memory database, seeded users,
// and a stub provider server standing in for the real endpoints.

#![allow(dead_code)]

use axum::{Json, Router, routing::post};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use std::time::Duration;

use switchboard::AppState;
use switchboard::llm::{
    AnthropicChatAdapter, ChatAdapter, ImageGenerationClient, OpenAiChatAdapter, ProviderKeys,
};
use switchboard::storage::{UserStore, migration};

pub const STUB_CHAT_REPLY: &str = "stub reply";
pub const STUB_IMAGE_URL: &str = "https://img.example/pic.png";

pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create in-memory sqlite");
    migration::run(&pool).await.expect("run migrations");
    pool
}

pub async fn seed_user(pool: &SqlitePool, user_id: &str, token: &str) {
    let users = UserStore::new(pool.clone());
    users
        .upsert_user(user_id, &format!("{user_id}@example.com"), Some("Test User"))
        .await
        .expect("seed user");
    users
        .create_session(token, user_id, Utc::now() + ChronoDuration::days(1))
        .await
        .expect("seed session");
}

/// Build an AppState whose adapters all point at `provider_base` with the
/// given request timeout.
pub fn test_state(
    pool: SqlitePool,
    provider_base: &str,
    default_keys: ProviderKeys,
    timeout: Duration,
    upload_dir: &str,
) -> Arc<AppState> {
    let adapters: Vec<Arc<dyn ChatAdapter>> = vec![
        Arc::new(OpenAiChatAdapter::new(provider_base, timeout)),
        Arc::new(AnthropicChatAdapter::new(provider_base, timeout)),
    ];
    let image_client = ImageGenerationClient::new(provider_base, timeout);

    AppState::assemble(
        pool,
        adapters,
        image_client,
        default_keys,
        upload_dir.to_string(),
        10 * 1024 * 1024,
        10,
    )
}

pub fn openai_keys() -> ProviderKeys {
    ProviderKeys {
        openai: Some("sk-test".into()),
        anthropic: None,
    }
}

/// Spawn a local server that answers like both providers. `delay` holds
/// every response back, which lets tests trip the adapter timeout.
pub async fn spawn_stub_provider(delay: Duration) -> String {
    async fn with_delay(delay: Duration, body: Value) -> Json<Value> {
        tokio::time::sleep(delay).await;
        Json(body)
    }

    let chat_delay = delay;
    let image_delay = delay;
    let messages_delay = delay;

    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(move || {
                with_delay(
                    chat_delay,
                    json!({
                        "choices": [{ "message": { "role": "assistant", "content": STUB_CHAT_REPLY } }],
                        "usage": { "prompt_tokens": 10, "completion_tokens": 3 }
                    }),
                )
            }),
        )
        .route(
            "/v1/images/generations",
            post(move || {
                with_delay(
                    image_delay,
                    json!({ "data": [{ "url": STUB_IMAGE_URL }] }),
                )
            }),
        )
        .route(
            "/v1/messages",
            post(move || {
                with_delay(
                    messages_delay,
                    json!({
                        "content": [{ "type": "text", "text": STUB_CHAT_REPLY }],
                        "usage": { "input_tokens": 10, "output_tokens": 3 }
                    }),
                )
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub provider");
    let addr = listener.local_addr().expect("stub provider addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub provider serves");
    });

    format!("http://{addr}")
}
