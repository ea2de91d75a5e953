// src/api/files.rs
// File upload, generation, and download. Bytes live on disk under the
// configured upload directory; text is extracted once at write time so
// the context assembler can inline it later without re-parsing.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path as UrlPath, State},
    http::header,
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{ApiError, ApiResult, IntoApiError};
use crate::state::AppState;
use crate::storage::{FileRow, files::extract_text};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileView {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
    pub has_content: bool,
}

pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .into_api_error("Failed to prepare upload directory")?;

    let mut uploaded = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() != Some("files") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| {
                mime_guess::from_path(&original_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        if bytes.len() > state.max_upload_bytes {
            return Err(ApiError::bad_request(format!(
                "File {original_name} exceeds maximum size of 10MB"
            )));
        }

        let extension = Path::new(&original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        let filename = format!("{}{extension}", Uuid::new_v4());
        let disk_path = Path::new(&state.upload_dir).join(&filename);

        tokio::fs::write(&disk_path, &bytes)
            .await
            .into_api_error("Failed to store uploaded file")?;

        let content = extract_text(&mime_type, &bytes);
        let file = FileRow {
            id: Uuid::new_v4().to_string(),
            filename: filename.clone(),
            original_name,
            mime_type,
            size: bytes.len() as i64,
            path: disk_path.to_string_lossy().into_owned(),
            url: format!("/api/files/download/{filename}"),
            content,
            created_at: Utc::now(),
        };

        state
            .files
            .insert(&file)
            .await
            .into_api_error("Failed to record uploaded file")?;

        info!(filename = %file.filename, mime = %file.mime_type, size = file.size, "file uploaded");

        uploaded.push(UploadedFileView {
            has_content: file.content.is_some(),
            id: file.id,
            filename: file.filename,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size: file.size,
            url: file.url,
        });
    }

    if uploaded.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    Ok(Json(json!({ "files": uploaded })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFileRequest {
    pub content: String,
    pub filename: String,
    pub file_type: Option<String>,
}

fn generated_file_kind(file_type: Option<&str>) -> (&'static str, &'static str) {
    match file_type.unwrap_or("text") {
        "markdown" => (".md", "text/markdown"),
        "javascript" => (".js", "text/javascript"),
        "typescript" => (".ts", "text/typescript"),
        "python" => (".py", "text/x-python"),
        "json" => (".json", "application/json"),
        "csv" => (".csv", "text/csv"),
        "html" => (".html", "text/html"),
        "css" => (".css", "text/css"),
        _ => (".txt", "text/plain"),
    }
}

/// Persist assistant-produced content as a downloadable file.
pub async fn generate_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateFileRequest>,
) -> ApiResult<Json<Value>> {
    if request.content.is_empty() || request.filename.is_empty() {
        return Err(ApiError::bad_request("Content and filename are required"));
    }

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .into_api_error("Failed to prepare upload directory")?;

    let (extension, mime_type) = generated_file_kind(request.file_type.as_deref());
    let filename = format!("{}_{}{extension}", Uuid::new_v4(), request.filename);
    let disk_path = Path::new(&state.upload_dir).join(&filename);

    tokio::fs::write(&disk_path, request.content.as_bytes())
        .await
        .into_api_error("Failed to write generated file")?;

    let file = FileRow {
        id: Uuid::new_v4().to_string(),
        filename: filename.clone(),
        original_name: format!("{}{extension}", request.filename),
        mime_type: mime_type.to_string(),
        size: request.content.len() as i64,
        path: disk_path.to_string_lossy().into_owned(),
        url: format!("/api/files/download/{filename}"),
        content: Some(request.content),
        created_at: Utc::now(),
    };

    state
        .files
        .insert(&file)
        .await
        .into_api_error("Failed to record generated file")?;

    Ok(Json(json!({
        "file": {
            "id": file.id,
            "filename": file.filename,
            "originalName": file.original_name,
            "mimeType": file.mime_type,
            "url": file.url,
        }
    })))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    UrlPath(filename): UrlPath<String>,
) -> ApiResult<Response> {
    // No traversal out of the upload directory.
    if filename.is_empty() || filename.contains("..") || filename.contains('/') {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let file = state
        .files
        .find_by_filename(&filename)
        .await
        .into_api_error("Failed to look up file")?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|_| ApiError::not_found("File not found on disk"))?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, file.mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.original_name),
        )
        .body(Body::from(bytes))
        .into_api_error("Failed to build download response")?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_file_kinds_map_extensions() {
        assert_eq!(generated_file_kind(Some("markdown")), (".md", "text/markdown"));
        assert_eq!(generated_file_kind(Some("python")), (".py", "text/x-python"));
        assert_eq!(generated_file_kind(None), (".txt", "text/plain"));
        assert_eq!(generated_file_kind(Some("unknown")), (".txt", "text/plain"));
    }
}
