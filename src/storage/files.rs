// src/storage/files.rs
// File metadata persistence plus text extraction for uploads. Binary
// payloads live on disk under the configured upload directory; only
// metadata and extracted text go in the database.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use super::FileRow;

#[derive(Clone)]
pub struct FileStore {
    pool: SqlitePool,
}

impl FileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, file: &FileRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (id, filename, original_name, mime_type, size, path, url, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&file.id)
        .bind(&file.filename)
        .bind(&file.original_name)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(&file.path)
        .bind(&file.url)
        .bind(&file.content)
        .bind(file.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, file_id: &str) -> Result<Option<FileRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, original_name, mime_type, size, path, url, content, created_at
            FROM files
            WHERE id = ?
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| file_from_row(&r)))
    }

    pub async fn find_by_filename(&self, filename: &str) -> Result<Option<FileRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, filename, original_name, mime_type, size, path, url, content, created_at
            FROM files
            WHERE filename = ?
            "#,
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| file_from_row(&r)))
    }
}

pub(crate) fn file_from_row(row: &sqlx::sqlite::SqliteRow) -> FileRow {
    FileRow {
        id: row.get("id"),
        filename: row.get("filename"),
        original_name: row.get("original_name"),
        mime_type: row.get("mime_type"),
        size: row.get("size"),
        path: row.get("path"),
        url: row.get("url"),
        content: row.get("content"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

/// Best-effort text extraction at upload time. Images deliberately yield
/// nothing here; their bytes are read back on demand for vision payloads.
pub fn extract_text(mime_type: &str, bytes: &[u8]) -> Option<String> {
    match mime_type {
        "text/plain" | "text/markdown" | "text/csv" | "application/json" => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        "application/pdf" => match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("pdf text extraction failed: {e}");
                None
            }
        },
        _ => None,
    }
}
