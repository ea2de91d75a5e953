// src/memory/store.rs
// SQLite-backed memory store. Upserts are keyed by (user, kind, key);
// confidence/importance start at the first-observation constants and step
// up once on re-observation, guarded by MAX() so they never move down.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::{ExtractedMemory, MemoryKind, UserMemory};

// First observation / re-observation scores per kind.
const PREFERENCE_SCORES: MemoryScores = MemoryScores {
    initial_confidence: 0.7,
    initial_importance: 0.6,
    reinforced_confidence: 0.8,
    reinforced_importance: 0.7,
};
const FACT_SCORES: MemoryScores = MemoryScores {
    initial_confidence: 0.6,
    initial_importance: 0.5,
    reinforced_confidence: 0.7,
    reinforced_importance: 0.6,
};

struct MemoryScores {
    initial_confidence: f64,
    initial_importance: f64,
    reinforced_confidence: f64,
    reinforced_importance: f64,
}

fn scores_for(kind: MemoryKind) -> &'static MemoryScores {
    match kind {
        MemoryKind::Preference => &PREFERENCE_SCORES,
        MemoryKind::Fact => &FACT_SCORES,
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
}

impl MemoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert extracted memories for a user. Idempotent on key collision:
    /// re-observing a known (kind, key) updates the value and raises the
    /// scores to the reinforced constants, never creating a second row.
    pub async fn record(&self, user_id: &str, extracted: &[ExtractedMemory]) -> Result<()> {
        for item in extracted {
            let scores = scores_for(item.kind);
            sqlx::query(
                r#"
                INSERT INTO memories (id, user_id, kind, key, value, confidence, importance, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(user_id, kind, key) DO UPDATE SET
                    value = excluded.value,
                    confidence = MAX(memories.confidence, ?),
                    importance = MAX(memories.importance, ?),
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(item.kind.as_str())
            .bind(item.key)
            .bind(&item.value)
            .bind(scores.initial_confidence)
            .bind(scores.initial_importance)
            .bind(Utc::now())
            .bind(scores.reinforced_confidence)
            .bind(scores.reinforced_importance)
            .execute(&self.pool)
            .await?;

            debug!(user_id, kind = item.kind.as_str(), key = item.key, "memory recorded");
        }

        Ok(())
    }

    /// Top memories for a user, ranked by importance descending.
    pub async fn top_memories(&self, user_id: &str, limit: i64) -> Result<Vec<UserMemory>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, key, value, confidence, importance, updated_at
            FROM memories
            WHERE user_id = ?
            ORDER BY importance DESC, updated_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut memories = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("kind");
            memories.push(UserMemory {
                id: row.get("id"),
                user_id: row.get("user_id"),
                kind: MemoryKind::from_str(&kind).unwrap_or(MemoryKind::Fact),
                key: row.get("key"),
                value: row.get("value"),
                confidence: row.get("confidence"),
                importance: row.get("importance"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(memories)
    }
}
