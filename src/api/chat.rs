// src/api/chat.rs
// The turn endpoint: one user message in, one assistant message out.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::auth::AuthUser;
use super::error::ApiResult;
use crate::llm::ProviderKeys;
use crate::state::AppState;
use crate::turn::TurnRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    pub chat_id: String,
    pub message: String,
    pub model: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub api_keys: ApiKeys,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatTurnResponse {
    pub content: String,
    pub model: String,
}

pub async fn chat_turn_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<ChatTurnRequest>,
) -> ApiResult<Json<ChatTurnResponse>> {
    info!(
        chat_id = %request.chat_id,
        model = %request.model,
        attachments = request.files.len(),
        "chat turn received"
    );

    let outcome = state
        .orchestrator
        .run_turn(
            &user.user_id,
            TurnRequest {
                chat_id: request.chat_id,
                message: request.message,
                model: request.model,
                attachment_ids: request.files,
                keys: ProviderKeys {
                    openai: request.api_keys.openai,
                    anthropic: request.api_keys.anthropic,
                },
            },
        )
        .await?;

    Ok(Json(ChatTurnResponse {
        content: outcome.content,
        model: outcome.model,
    }))
}
