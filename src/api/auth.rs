// src/api/auth.rs
// Session-token authentication. Every owner-scoped handler takes AuthUser
// as an extractor; a request without a live session never reaches one.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use super::error::{ApiError, IntoApiError};
use crate::state::AppState;

const SESSION_COOKIE: &str = "session_token";

/// The authenticated principal for this request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or_else(|| ApiError::unauthorized("Authentication required. Please sign in."))?;

        let session = state
            .users
            .find_session(&token)
            .await
            .into_api_error("Failed to look up session")?
            .ok_or_else(|| ApiError::unauthorized("Session expired. Please sign in again."))?;

        Ok(AuthUser {
            user_id: session.user_id,
            email: session.email,
            name: session.name,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .map(|t| t.to_string())
        .filter(|t| !t.is_empty())
}
