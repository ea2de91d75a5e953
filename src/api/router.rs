// src/api/router.rs
// HTTP router composition.

use axum::{
    Json, Router,
    http::HeaderValue,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::chat::chat_turn_handler;
use super::chats::{
    create_chat, create_message, delete_chat, list_chats, list_messages, rename_chat,
};
use super::files::{download_file, generate_file, upload_files};
use crate::config::CONFIG;
use crate::state::AppState;

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer() -> CorsLayer {
    match CONFIG.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => CorsLayer::permissive(),
    }
}

/// The full application router.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Turn orchestration
        .route("/api/chat", post(chat_turn_handler))
        // Chat + message CRUD
        .route("/api/chats", get(list_chats).post(create_chat))
        .route(
            "/api/chats/{chat_id}",
            axum::routing::patch(rename_chat).delete(delete_chat),
        )
        .route(
            "/api/chats/{chat_id}/messages",
            get(list_messages).post(create_message),
        )
        // Files
        .route("/api/files/upload", post(upload_files))
        .route("/api/files/generate", post(generate_file))
        .route("/api/files/download/{filename}", get(download_file))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}
