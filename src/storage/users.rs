// src/storage/users.rs
// Users and session tokens. Session lookup is the whole auth boundary:
// a token either resolves to a live user or the request is rejected.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::SessionUser;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert_user(&self, id: &str, email: &str, name: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, expires_at)
            VALUES (?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET user_id = excluded.user_id, expires_at = excluded.expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a session token to its user. Expired sessions resolve to
    /// None, same as unknown tokens.
    pub async fn find_session(&self, token: &str) -> Result<Option<SessionUser>> {
        let row = sqlx::query(
            r#"
            SELECT u.id AS user_id, u.email, u.name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ? AND s.expires_at > ?
            "#,
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SessionUser {
            user_id: r.get("user_id"),
            email: r.get("email"),
            name: r.get("name"),
        }))
    }
}
