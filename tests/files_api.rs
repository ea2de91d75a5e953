// tests/files_api.rs
// Upload, generate, and download round trips, including text extraction
// and the path-traversal guard.

mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use common::{memory_pool, openai_keys, seed_user, spawn_stub_provider, test_state};
use switchboard::api_router;

const BOUNDARY: &str = "sbtestboundary";

async fn test_app() -> (Router, TempDir) {
    let pool = memory_pool().await;
    seed_user(&pool, "alice", "tok-alice").await;

    let base = spawn_stub_provider(Duration::ZERO).await;
    let upload_dir = TempDir::new().expect("temp upload dir");
    let state = test_state(
        pool,
        &base,
        openai_keys(),
        Duration::from_secs(5),
        upload_dir.path().to_str().unwrap(),
    );
    (api_router(state), upload_dir)
}

fn multipart_upload(filename: &str, mime: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\n\
         Content-Type: {mime}\r\n\r\n\
         {content}\r\n\
         --{BOUNDARY}--\r\n"
    );

    Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn text_uploads_are_stored_and_extracted() {
    let (app, _upload_dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(multipart_upload("notes.txt", "text/plain", "remember the milk"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let file = &body["files"][0];
    assert_eq!(file["originalName"], "notes.txt");
    assert_eq!(file["mimeType"], "text/plain");
    assert_eq!(file["hasContent"], true);

    // Round trip the bytes back out.
    let url = file["url"].as_str().unwrap().to_string();
    let response = app
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/plain"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"remember the milk");
}

#[tokio::test]
async fn empty_uploads_are_rejected() {
    let (app, _upload_dir) = test_app().await;

    let body = format!("--{BOUNDARY}--\r\n");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/files/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "No files provided");
}

#[tokio::test]
async fn generated_files_get_typed_extensions() {
    let (app, _upload_dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/files/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "content": "# Notes\n\n- one",
                        "filename": "notes",
                        "fileType": "markdown"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["file"]["mimeType"], "text/markdown");
    assert_eq!(body["file"]["originalName"], "notes.md");
}

#[tokio::test]
async fn download_rejects_path_traversal() {
    let (app, _upload_dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/files/download/..")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_downloads_are_not_found() {
    let (app, _upload_dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/files/download/nope.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
