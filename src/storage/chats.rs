// src/storage/chats.rs
// Chat and message persistence. Every read that takes a user id is
// owner-scoped in the query itself; a chat owned by someone else is
// indistinguishable from a chat that does not exist.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{ChatRow, FileRow, MessageRow};

#[derive(Clone)]
pub struct ChatStore {
    pool: SqlitePool,
}

impl ChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_chat(&self, user_id: &str, model: &str, title: &str) -> Result<ChatRow> {
        let now = Utc::now();
        let chat = ChatRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            model: model.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO chats (id, user_id, title, model, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&chat.id)
        .bind(&chat.user_id)
        .bind(&chat.title)
        .bind(&chat.model)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(chat)
    }

    pub async fn list_chats(&self, user_id: &str) -> Result<Vec<ChatRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, model, created_at, updated_at
            FROM chats
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| Self::chat_from_row(&row)).collect())
    }

    /// Fetch a chat only if it belongs to the given user.
    pub async fn find_owned(&self, chat_id: &str, user_id: &str) -> Result<Option<ChatRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, model, created_at, updated_at
            FROM chats
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Self::chat_from_row(&r)))
    }

    /// All messages of a chat in chronological order.
    pub async fn messages(&self, chat_id: &str) -> Result<Vec<MessageRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, role, content, model, created_at
            FROM messages
            WHERE chat_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| Self::message_from_row(&row)).collect())
    }

    /// Store a message, link its attachments, and bump the chat's
    /// updated_at so listings sort by recency.
    pub async fn create_message(
        &self,
        chat_id: &str,
        role: &str,
        content: &str,
        model: Option<&str>,
        file_ids: &[String],
    ) -> Result<MessageRow> {
        let message = MessageRow {
            id: Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            model: model.map(str::to_string),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, role, content, model, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&message.model)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        for file_id in file_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO message_files (message_id, file_id) VALUES (?, ?)",
            )
            .bind(&message.id)
            .bind(file_id)
            .execute(&self.pool)
            .await?;
        }

        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(message)
    }

    /// Files linked to a message, in link order.
    pub async fn message_files(&self, message_id: &str) -> Result<Vec<FileRow>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.filename, f.original_name, f.mime_type, f.size, f.path, f.url,
                   f.content, f.created_at
            FROM message_files mf
            JOIN files f ON f.id = mf.file_id
            WHERE mf.message_id = ?
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| super::files::file_from_row(&row)).collect())
    }

    pub async fn set_title(&self, chat_id: &str, title: &str) -> Result<()> {
        sqlx::query("UPDATE chats SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(Utc::now())
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        sqlx::query(
            "DELETE FROM message_files WHERE message_id IN (SELECT id FROM messages WHERE chat_id = ?)",
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;
        sqlx::query("DELETE FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn chat_from_row(row: &sqlx::sqlite::SqliteRow) -> ChatRow {
        ChatRow {
            id: row.get("id"),
            user_id: row.get("user_id"),
            title: row.get("title"),
            model: row.get("model"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }
    }

    fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> MessageRow {
        MessageRow {
            id: row.get("id"),
            chat_id: row.get("chat_id"),
            role: row.get("role"),
            content: row.get("content"),
            model: row.get("model"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
        }
    }
}
