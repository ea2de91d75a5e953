// src/turn/intent.rs
// Keyword image-intent classification and prompt extraction.
//
// This is a substring scan, not NLP. False positives ("I took a picture of
// the whiteboard") are an accepted trade-off for recall; the orchestrator
// only depends on `classify`, so a smarter strategy can slot in behind the
// same signature.

use once_cell::sync::Lazy;
use regex::Regex;

/// Classification result. `image_prompt` is always usable: the extracted
/// description when a pattern matched, otherwise the message with any
/// leading trigger phrase stripped, otherwise the message itself.
#[derive(Debug, Clone)]
pub struct ImageIntent {
    pub is_image_request: bool,
    pub image_prompt: String,
}

const IMAGE_TRIGGERS: &[&str] = &[
    "generate an image",
    "create an image",
    "make an image",
    "draw an image",
    "create a picture",
    "generate a picture",
    "make a picture",
    "draw a picture",
    "picture of",
    "image of",
    "photo of",
    "drawing of",
    "sketch of",
    "painting of",
    "illustration of",
    "create art",
    "generate art",
    "make art",
    "draw something",
    "create an illustration",
    "generate an illustration",
    "make an illustration",
    "can you draw",
    "can you create an image",
    "can you generate an image",
    "show me an image",
    "i want an image",
    "i need an image",
    "paint an image",
    "sketch an image",
    "design an image",
    "make a new image",
    "create another image",
    "generate another",
    "draw me",
    "show me a picture",
];

// Ordered; the first pattern that matches wins.
static PROMPT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:generate an image of|create an image of|make an image of|draw an image of|create a picture of|generate a picture of|make a picture of|draw a picture of)\s*(.+)",
        r"(?i)(?:picture of|image of|photo of|drawing of|sketch of|painting of|illustration of)\s*(.+)",
        r"(?i)(?:generate an image|create an image|make an image|draw an image|create a picture|generate a picture|make a picture|draw a picture):\s*(.+)",
        r"(?i)(?:can you (?:draw|create|generate|make))(?:\s+(?:an?\s+)?(?:image|picture|illustration))?\s+(?:of\s+)?(.+)",
        r"(?i)(?:i want an image of|i need an image of|show me an image of|show me a picture of)\s*(.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("prompt pattern compiles"))
    .collect()
});

static TRIGGER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(generate an image|create an image|make an image|draw an image|create a picture|generate a picture|make a picture|draw a picture|picture of|image of|photo of|can you draw|can you create an image|can you generate an image|show me an image|i want an image|i need an image|paint an image|sketch an image|design an image)[:\s]*",
    )
    .expect("trigger prefix pattern compiles")
});

/// Decide whether a message asks for image generation, and pull out the
/// best prompt for it. Pure and total; never fails.
pub fn classify(message: &str) -> ImageIntent {
    let lower = message.to_lowercase();
    let is_image_request = IMAGE_TRIGGERS.iter().any(|t| lower.contains(t));

    ImageIntent {
        is_image_request,
        image_prompt: extract_prompt(message),
    }
}

fn extract_prompt(message: &str) -> String {
    for pattern in PROMPT_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(message) {
            if let Some(prompt) = captures.get(1) {
                let prompt = prompt.as_str().trim();
                if !prompt.is_empty() {
                    return prompt.to_string();
                }
            }
        }
    }

    // No anchored pattern matched; strip a leading trigger phrase and use
    // the remainder, or the whole message as a last resort.
    let stripped = TRIGGER_PREFIX.replace(message, "").trim().to_string();
    if stripped.is_empty() {
        message.to_string()
    } else {
        stripped
    }
}
