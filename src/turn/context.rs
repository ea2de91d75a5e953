// src/turn/context.rs
// Builds the ordered role/content sequence sent to a provider for one turn.
//
// Ordering contract: synthetic memory context first, prior turns in
// chronological order, the current user turn last. Capability rules are
// applied here once, so adapters never branch on model families.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

use crate::memory::UserMemory;
use crate::turn::capability::ModelCapability;

/// Closed message role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Map a stored role string; anything unrecognized degrades to `User`.
    pub fn from_db(role: &str) -> Self {
        match role {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One block of a multi-part (vision) message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text { text: String },
    /// Base64-encoded image bytes plus their MIME type.
    Image { media_type: String, data: String },
}

/// Message content: plain text for every message except the vision-enabled
/// current turn, which carries text plus inline images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone)]
pub struct ContextEntry {
    pub role: Role,
    pub body: MessageBody,
}

/// A prior turn loaded from chat history.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// An attachment resolved through the file store: extracted text for
/// documents, raw bytes (read on demand) for images.
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    pub name: String,
    pub mime_type: String,
    pub text: Option<String>,
    pub bytes: Option<Vec<u8>>,
}

impl ResolvedAttachment {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// The ephemeral sequence a provider adapter consumes once.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    pub entries: Vec<ContextEntry>,
}

impl AssembledContext {
    /// Text of the current (final) user entry; for multi-part bodies this
    /// is the leading text block.
    pub fn current_user_text(&self) -> &str {
        match self.entries.last().map(|e| &e.body) {
            Some(MessageBody::Text(text)) => text,
            Some(MessageBody::Parts(parts)) => parts
                .iter()
                .find_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .unwrap_or(""),
            None => "",
        }
    }
}

/// Fold non-image attachment content into the message text. Documents with
/// extracted text are inlined; the rest get a one-line placeholder.
pub fn fold_attachment_text(message: &str, attachments: &[ResolvedAttachment]) -> String {
    let blocks: Vec<String> = attachments
        .iter()
        .filter(|a| !a.is_image())
        .map(|a| match &a.text {
            Some(text) => format!("File: {}\nContent: {}", a.name, text),
            None => format!("File: {} ({})", a.name, a.mime_type),
        })
        .collect();

    if blocks.is_empty() {
        message.to_string()
    } else {
        format!("{}\n\nAttached files:\n{}", message, blocks.join("\n\n"))
    }
}

/// Assemble the provider-bound context for one turn.
pub fn assemble(
    prior: &[HistoryMessage],
    memories: &[UserMemory],
    message: &str,
    attachments: &[ResolvedAttachment],
    capability: &ModelCapability,
) -> AssembledContext {
    let mut entries = Vec::with_capacity(prior.len() + 2);

    if !memories.is_empty() {
        let memory_lines: Vec<String> = memories
            .iter()
            .map(|m| format!("{}: {}", m.key, m.value))
            .collect();
        entries.push(ContextEntry {
            role: Role::System,
            body: MessageBody::Text(format!(
                "Context about the user: {}",
                memory_lines.join("\n")
            )),
        });
    }

    for msg in prior {
        entries.push(ContextEntry {
            role: msg.role,
            body: MessageBody::Text(msg.content.clone()),
        });
    }

    let message_with_files = fold_attachment_text(message, attachments);
    let image_attachments: Vec<&ResolvedAttachment> =
        attachments.iter().filter(|a| a.is_image()).collect();

    if !image_attachments.is_empty() && capability.supports_vision {
        let mut parts = vec![ContentPart::Text {
            text: message_with_files,
        }];
        for image in &image_attachments {
            match &image.bytes {
                Some(bytes) => parts.push(ContentPart::Image {
                    media_type: image.mime_type.clone(),
                    data: BASE64.encode(bytes),
                }),
                None => debug!(name = %image.name, "image attachment has no readable bytes, skipping"),
            }
        }
        entries.push(ContextEntry {
            role: Role::User,
            body: MessageBody::Parts(parts),
        });
    } else {
        if !image_attachments.is_empty() {
            // Model has no vision path; the text still goes through.
            debug!(
                count = image_attachments.len(),
                "dropping image attachments for a non-vision model"
            );
        }
        entries.push(ContextEntry {
            role: Role::User,
            body: MessageBody::Text(message_with_files),
        });
    }

    if !capability.supports_system_message {
        entries.retain(|e| e.role != Role::System);
    }

    AssembledContext { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Provider;
    use crate::turn::capability::{ModelCapability, RequestKind};
    use chrono::Utc;

    fn chat_capability(vision: bool, system: bool) -> ModelCapability {
        ModelCapability {
            provider: Provider::OpenAi,
            kind: RequestKind::Chat,
            supports_vision: vision,
            supports_system_message: system,
            supports_sampling_params: true,
        }
    }

    fn memory(key: &str, value: &str, importance: f64) -> UserMemory {
        UserMemory {
            id: "m".into(),
            user_id: "u".into(),
            kind: crate::memory::MemoryKind::Preference,
            key: key.into(),
            value: value.into(),
            confidence: 0.7,
            importance,
            updated_at: Utc::now(),
        }
    }

    fn history(role: Role, content: &str) -> HistoryMessage {
        HistoryMessage {
            role,
            content: content.into(),
        }
    }

    fn image_attachment(name: &str) -> ResolvedAttachment {
        ResolvedAttachment {
            name: name.into(),
            mime_type: "image/png".into(),
            text: None,
            bytes: Some(vec![1, 2, 3]),
        }
    }

    #[test]
    fn ordering_is_memories_then_history_then_current() {
        let prior = vec![
            history(Role::User, "first"),
            history(Role::Assistant, "second"),
        ];
        let memories = vec![memory("likes", "hiking", 0.6)];

        let context = assemble(&prior, &memories, "third", &[], &chat_capability(false, true));

        assert_eq!(context.entries.len(), prior.len() + 1 + 1);
        assert_eq!(context.entries[0].role, Role::System);
        assert_eq!(
            context.entries[1].body,
            MessageBody::Text("first".into())
        );
        assert_eq!(
            context.entries[2].body,
            MessageBody::Text("second".into())
        );
        let last = context.entries.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.body, MessageBody::Text("third".into()));
    }

    #[test]
    fn no_memories_means_no_system_entry() {
        let context = assemble(&[], &[], "hello", &[], &chat_capability(false, true));
        assert_eq!(context.entries.len(), 1);
        assert_eq!(context.entries[0].role, Role::User);
    }

    #[test]
    fn memory_entry_renders_key_value_lines() {
        let memories = vec![memory("likes", "hiking", 0.7), memory("name", "sam", 0.5)];
        let context = assemble(&[], &memories, "hi", &[], &chat_capability(false, true));

        match &context.entries[0].body {
            MessageBody::Text(text) => {
                assert!(text.starts_with("Context about the user:"));
                assert!(text.contains("likes: hiking"));
                assert!(text.contains("name: sam"));
            }
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[test]
    fn system_entries_are_stripped_for_reasoning_models() {
        let prior = vec![history(Role::System, "old system"), history(Role::User, "q")];
        let memories = vec![memory("likes", "tea", 0.5)];

        let context = assemble(&prior, &memories, "next", &[], &chat_capability(false, false));

        assert!(context.entries.iter().all(|e| e.role != Role::System));
        assert_eq!(context.entries.last().unwrap().role, Role::User);
    }

    #[test]
    fn vision_capability_gets_multipart_current_turn() {
        let attachments = vec![image_attachment("photo.png")];
        let context = assemble(&[], &[], "look", &attachments, &chat_capability(true, true));

        match &context.entries.last().unwrap().body {
            MessageBody::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], ContentPart::Text { text } if text == "look"));
                assert!(matches!(
                    &parts[1],
                    ContentPart::Image { media_type, .. } if media_type == "image/png"
                ));
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }

    #[test]
    fn images_are_dropped_silently_without_vision() {
        let attachments = vec![image_attachment("photo.png")];
        let context = assemble(&[], &[], "look", &attachments, &chat_capability(false, true));

        let last = context.entries.last().unwrap();
        assert_eq!(last.body, MessageBody::Text("look".into()));
    }

    #[test]
    fn document_attachments_fold_into_the_message() {
        let attachments = vec![
            ResolvedAttachment {
                name: "notes.txt".into(),
                mime_type: "text/plain".into(),
                text: Some("remember the milk".into()),
                bytes: None,
            },
            ResolvedAttachment {
                name: "scan.bin".into(),
                mime_type: "application/octet-stream".into(),
                text: None,
                bytes: None,
            },
        ];

        let context = assemble(&[], &[], "see files", &attachments, &chat_capability(false, true));
        let text = context.current_user_text();

        assert!(text.starts_with("see files"));
        assert!(text.contains("File: notes.txt\nContent: remember the milk"));
        assert!(text.contains("File: scan.bin (application/octet-stream)"));
    }
}
