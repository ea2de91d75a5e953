// src/api/mod.rs

pub mod auth;
pub mod chat;
pub mod chats;
pub mod error;
pub mod files;
pub mod router;

pub use error::{ApiError, ApiResult};
pub use router::api_router;
