// src/memory/extract.rs
// Pattern-based extraction of durable facts/preferences from a user turn.
// Pure and deterministic; runs over the lower-cased raw message.

use once_cell::sync::Lazy;
use regex::Regex;

use super::MemoryKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMemory {
    pub kind: MemoryKind,
    pub key: &'static str,
    pub value: String,
}

static LIKES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"i (?:like|love) ([^.!?]+)").expect("likes pattern compiles"));
static PREFERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"i (?:prefer|would rather) ([^.!?]+)").expect("prefers pattern compiles")
});
static NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:my name is|i'm) ([a-z]+)").expect("name pattern compiles"));
static OCCUPATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:i work (?:as|at)|my job (?:is|at)) ([^.!?]+)").expect("occupation pattern compiles")
});

/// Extract memory candidates from one user message. Each matching pattern
/// can fire more than once ("I like tea. I like rain." yields two likes).
pub fn extract(message: &str) -> Vec<ExtractedMemory> {
    let lower = message.to_lowercase();
    let mut extracted = Vec::new();

    let mut capture_all = |pattern: &Regex, kind: MemoryKind, key: &'static str| {
        for captures in pattern.captures_iter(&lower) {
            if let Some(value) = captures.get(1) {
                let value = value.as_str().trim();
                if !value.is_empty() {
                    extracted.push(ExtractedMemory {
                        kind,
                        key,
                        value: value.to_string(),
                    });
                }
            }
        }
    };

    capture_all(&LIKES, MemoryKind::Preference, "likes");
    capture_all(&PREFERS, MemoryKind::Preference, "preferences");
    capture_all(&NAME, MemoryKind::Fact, "name");
    capture_all(&OCCUPATION, MemoryKind::Fact, "occupation");

    extracted
}
