// src/storage/mod.rs
// SQLite persistence: row types plus owner-scoped stores for chats,
// messages, files, and auth sessions.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod chats;
pub mod files;
pub mod migration;
pub mod users;

pub use chats::ChatStore;
pub use files::FileStore;
pub use users::UserStore;

/// Default title given to freshly created chats; the orchestrator replaces
/// it after the first real turn.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

#[derive(Debug, Clone, Serialize)]
pub struct ChatRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub role: String,
    pub content: String,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileRow {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub path: String,
    pub url: String,
    /// Extracted text for documents; None for images and opaque binaries.
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An authenticated principal resolved from a session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}
