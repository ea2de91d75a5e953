// src/api/chats.rs
// Chat and message CRUD. All reads and writes are scoped to the
// authenticated user; a foreign chat id is reported as not found.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use super::auth::AuthUser;
use super::error::{ApiError, ApiResult, IntoApiError};
use crate::state::AppState;
use crate::storage::{ChatRow, DEFAULT_CHAT_TITLE, MessageRow};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub role: String,
    pub content: String,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<FileView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub id: String,
    pub title: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<MessageView>,
    pub message_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub model: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: String,
    pub role: String,
    pub model: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    pub title: String,
}

async fn message_views(state: &AppState, messages: Vec<MessageRow>) -> ApiResult<Vec<MessageView>> {
    let mut views = Vec::with_capacity(messages.len());
    for message in messages {
        let files = state
            .chats
            .message_files(&message.id)
            .await
            .into_api_error("Failed to load message files")?
            .into_iter()
            .map(|f| FileView {
                id: f.id,
                filename: f.filename,
                mime_type: f.mime_type,
                url: f.url,
            })
            .collect();

        views.push(MessageView {
            id: message.id,
            role: message.role,
            content: message.content,
            model: message.model,
            created_at: message.created_at,
            files,
        });
    }
    Ok(views)
}

async fn chat_view(state: &AppState, chat: ChatRow) -> ApiResult<ChatView> {
    let messages = state
        .chats
        .messages(&chat.id)
        .await
        .into_api_error("Failed to load messages")?;
    let messages = message_views(state, messages).await?;

    Ok(ChatView {
        id: chat.id,
        title: chat.title,
        model: chat.model,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
        message_count: messages.len(),
        messages,
    })
}

pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<ChatView>>> {
    let chats = state
        .chats
        .list_chats(&user.user_id)
        .await
        .into_api_error("Failed to fetch chats")?;

    let mut views = Vec::with_capacity(chats.len());
    for chat in chats {
        views.push(chat_view(&state, chat).await?);
    }
    Ok(Json(views))
}

pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(request): Json<CreateChatRequest>,
) -> ApiResult<Json<ChatView>> {
    let model = request.model.as_deref().unwrap_or("gpt-4");
    let title = request.title.as_deref().unwrap_or(DEFAULT_CHAT_TITLE);

    let chat = state
        .chats
        .create_chat(&user.user_id, model, title)
        .await
        .into_api_error("Failed to create chat")?;

    chat_view(&state, chat).await.map(Json)
}

async fn owned_chat(state: &AppState, chat_id: &str, user_id: &str) -> ApiResult<ChatRow> {
    state
        .chats
        .find_owned(chat_id, user_id)
        .await
        .into_api_error("Failed to load chat")?
        .ok_or_else(|| ApiError::not_found("Chat not found"))
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Vec<MessageView>>> {
    owned_chat(&state, &chat_id, &user.user_id).await?;

    let messages = state
        .chats
        .messages(&chat_id)
        .await
        .into_api_error("Failed to fetch messages")?;
    message_views(&state, messages).await.map(Json)
}

pub async fn create_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(request): Json<CreateMessageRequest>,
) -> ApiResult<Json<MessageView>> {
    owned_chat(&state, &chat_id, &user.user_id).await?;

    let message = state
        .chats
        .create_message(
            &chat_id,
            &request.role,
            &request.content,
            request.model.as_deref(),
            &request.files,
        )
        .await
        .into_api_error("Failed to create message")?;

    let mut views = message_views(&state, vec![message]).await?;
    Ok(Json(views.remove(0)))
}

pub async fn rename_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
    Json(request): Json<RenameChatRequest>,
) -> ApiResult<Json<ChatView>> {
    owned_chat(&state, &chat_id, &user.user_id).await?;

    state
        .chats
        .set_title(&chat_id, &request.title)
        .await
        .into_api_error("Failed to update chat")?;

    let chat = owned_chat(&state, &chat_id, &user.user_id).await?;
    chat_view(&state, chat).await.map(Json)
}

pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Json<Value>> {
    owned_chat(&state, &chat_id, &user.user_id).await?;

    state
        .chats
        .delete_chat(&chat_id)
        .await
        .into_api_error("Failed to delete chat")?;

    Ok(Json(json!({ "success": true })))
}
