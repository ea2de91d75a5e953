// src/memory/mod.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

pub mod extract;
pub mod store;

pub use extract::{ExtractedMemory, extract};
pub use store::MemoryStore;

/// Durable memory categories. Preferences are tastes ("likes hiking");
/// facts are identity details ("occupation: baker").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Preference,
    Fact,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Preference => "preference",
            MemoryKind::Fact => "fact",
        }
    }
}

// Parse MemoryKind from strings defensively (DB interop).
impl FromStr for MemoryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference" => Ok(MemoryKind::Preference),
            "fact" => Ok(MemoryKind::Fact),
            _ => Err(()),
        }
    }
}

/// A confidence-scored fact or preference about a user, replayed as
/// conversational context on later turns. Unique per (user, kind, key);
/// confidence and importance only ever increase.
#[derive(Debug, Clone, Serialize)]
pub struct UserMemory {
    pub id: String,
    pub user_id: String,
    pub kind: MemoryKind,
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub importance: f64,
    pub updated_at: DateTime<Utc>,
}
