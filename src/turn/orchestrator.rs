// src/turn/orchestrator.rs
// One user message in, one assistant message out. The orchestrator
// sequences classification, context assembly, dispatch, and write-back,
// with a hard rule: once the user's message is committed, the turn always
// completes with something stored for the assistant side.

use anyhow::{Context as _, anyhow};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatAdapter, ImageGenerationClient, Provider, ProviderError, ProviderKeys};
use crate::memory::{self, MemoryStore};
use crate::storage::{ChatStore, DEFAULT_CHAT_TITLE, FileStore};
use crate::turn::capability::{self, ModelCapability, RequestKind};
use crate::turn::context::{self, HistoryMessage, ResolvedAttachment, Role};
use crate::turn::intent;

const TITLE_WORD_COUNT: usize = 6;
const TITLE_MAX_CHARS: usize = 50;

/// Input of one turn. Built per request, never persisted as its own
/// entity.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub chat_id: String,
    pub message: String,
    pub model: String,
    pub attachment_ids: Vec<String>,
    pub keys: ProviderKeys,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub content: String,
    pub model: String,
}

/// Turn failures that surface to the caller. Provider trouble is absent
/// on purpose: it is downgraded to fallback text inside the turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Unsupported model: {0}")]
    UnknownModel(String),
    #[error("{0} API key not configured")]
    MissingCredential(Provider),
    #[error("Chat not found")]
    ChatNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
enum TurnPhase {
    Received,
    FilesResolved,
    HistoryAssembled,
    Classified,
    Dispatched,
    Completed,
    Failed,
}

impl TurnPhase {
    fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Received => "received",
            TurnPhase::FilesResolved => "files_resolved",
            TurnPhase::HistoryAssembled => "history_assembled",
            TurnPhase::Classified => "classified",
            TurnPhase::Dispatched => "dispatched",
            TurnPhase::Completed => "completed",
            TurnPhase::Failed => "failed",
        }
    }
}

pub struct TurnOrchestrator {
    chats: ChatStore,
    files: FileStore,
    memories: MemoryStore,
    adapters: HashMap<Provider, Arc<dyn ChatAdapter>>,
    image_client: ImageGenerationClient,
    default_keys: ProviderKeys,
    memory_context_limit: i64,
}

impl TurnOrchestrator {
    pub fn new(
        chats: ChatStore,
        files: FileStore,
        memories: MemoryStore,
        adapters: Vec<Arc<dyn ChatAdapter>>,
        image_client: ImageGenerationClient,
        default_keys: ProviderKeys,
        memory_context_limit: i64,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.provider(), adapter))
            .collect();

        Self {
            chats,
            files,
            memories,
            adapters,
            image_client,
            default_keys,
            memory_context_limit,
        }
    }

    /// Run one turn for an authenticated user. Fail-fast gates (unknown
    /// model, foreign chat, missing credential) reject before anything is
    /// written; after the user message is committed the turn cannot fail
    /// short of a datastore error.
    pub async fn run_turn(
        &self,
        user_id: &str,
        request: TurnRequest,
    ) -> Result<TurnOutcome, TurnError> {
        let chat_id = request.chat_id.clone();
        let result = self.execute(user_id, request).await;
        if result.is_err() {
            self.trace(TurnPhase::Failed, &chat_id);
        }
        result
    }

    async fn execute(&self, user_id: &str, request: TurnRequest) -> Result<TurnOutcome, TurnError> {
        let chat_id = request.chat_id.as_str();
        self.trace(TurnPhase::Received, chat_id);

        let capability = capability::lookup(&request.model)
            .ok_or_else(|| TurnError::UnknownModel(request.model.clone()))?;

        let chat = self
            .chats
            .find_owned(chat_id, user_id)
            .await
            .context("failed to load chat")?
            .ok_or(TurnError::ChatNotFound)?;

        let (attachments, linked_file_ids) = self
            .resolve_attachments(&request.attachment_ids, capability)
            .await?;
        self.trace(TurnPhase::FilesResolved, chat_id);

        let prior_rows = self
            .chats
            .messages(chat_id)
            .await
            .context("failed to load chat history")?;
        let prior_count = prior_rows.len();
        let prior: Vec<HistoryMessage> = prior_rows
            .iter()
            .map(|m| HistoryMessage {
                role: Role::from_db(&m.role),
                content: m.content.clone(),
            })
            .collect();

        let memories = self
            .memories
            .top_memories(user_id, self.memory_context_limit)
            .await
            .context("failed to load memories")?;

        let assembled =
            context::assemble(&prior, &memories, &request.message, &attachments, capability);
        self.trace(TurnPhase::HistoryAssembled, chat_id);

        let intent = intent::classify(&request.message);
        let image_route =
            intent.is_image_request || capability.kind == RequestKind::ImageGeneration;
        self.trace(TurnPhase::Classified, chat_id);

        // Credential gate: resolve the key for the route we are about to
        // take, before any message is stored. Image generation always
        // rides the OpenAI key regardless of the selected chat model.
        let keys = request.keys.merged_with(&self.default_keys);
        let route_provider = if image_route {
            Provider::OpenAi
        } else {
            capability.provider
        };
        let api_key = keys
            .key_for(route_provider)
            .map_err(|_| TurnError::MissingCredential(route_provider))?
            .to_string();

        let adapter = if image_route {
            None
        } else {
            Some(self.adapters.get(&capability.provider).ok_or_else(|| {
                TurnError::Internal(anyhow!(
                    "no adapter registered for {}",
                    capability.provider
                ))
            })?)
        };

        // Commit the user's side of the turn. From here on the turn
        // completes no matter what the provider does.
        self.chats
            .create_message(chat_id, "user", &request.message, None, &linked_file_ids)
            .await
            .context("failed to store user message")?;

        self.trace(TurnPhase::Dispatched, chat_id);
        let content = if image_route {
            // Extracted prompt for classified requests; for an explicitly
            // selected image model the whole message is the prompt.
            let prompt = if intent.is_image_request {
                intent.image_prompt.clone()
            } else {
                assembled.current_user_text().to_string()
            };

            match self.image_client.generate(&prompt, &api_key).await {
                Ok(markdown) => markdown,
                Err(e) => {
                    warn!(chat_id, error = %e, "image generation failed, storing fallback");
                    image_fallback(&e)
                }
            }
        } else {
            let adapter = adapter.expect("chat route resolved an adapter");
            match adapter
                .invoke(&request.model, capability, &assembled, &api_key)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(chat_id, error = %e, "provider call failed, storing fallback");
                    chat_fallback(adapter.provider(), &e)
                }
            }
        };

        self.chats
            .create_message(chat_id, "assistant", &content, Some(&request.model), &[])
            .await
            .context("failed to store assistant message")?;

        let extracted = memory::extract(&request.message);
        if !extracted.is_empty() {
            if let Err(e) = self.memories.record(user_id, &extracted).await {
                warn!(chat_id, "memory write-back failed: {e:#}");
            }
        }

        if prior_count == 0 || chat.title == DEFAULT_CHAT_TITLE {
            if let Err(e) = self
                .chats
                .set_title(chat_id, &derive_title(&request.message))
                .await
            {
                warn!(chat_id, "title update failed: {e:#}");
            }
        }

        self.trace(TurnPhase::Completed, chat_id);
        Ok(TurnOutcome {
            content,
            model: request.model,
        })
    }

    /// Resolve attachment ids through the file store. Unknown ids are
    /// skipped. Image bytes are read from disk only when the selected
    /// model can actually consume them.
    async fn resolve_attachments(
        &self,
        attachment_ids: &[String],
        capability: &ModelCapability,
    ) -> Result<(Vec<ResolvedAttachment>, Vec<String>), TurnError> {
        let mut attachments = Vec::with_capacity(attachment_ids.len());
        let mut linked_ids = Vec::with_capacity(attachment_ids.len());

        for id in attachment_ids {
            let Some(file) = self
                .files
                .find(id)
                .await
                .context("failed to load attachment")?
            else {
                debug!(file_id = %id, "attachment id not found, skipping");
                continue;
            };

            let is_image = file.mime_type.starts_with("image/");
            let bytes = if is_image && capability.supports_vision {
                match tokio::fs::read(&file.path).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        warn!(path = %file.path, "failed to read attachment bytes: {e}");
                        None
                    }
                }
            } else {
                None
            };

            linked_ids.push(file.id.clone());
            attachments.push(ResolvedAttachment {
                name: file.original_name,
                mime_type: file.mime_type,
                text: file.content,
                bytes,
            });
        }

        Ok((attachments, linked_ids))
    }

    fn trace(&self, phase: TurnPhase, chat_id: &str) {
        debug!(phase = phase.as_str(), chat_id, "turn phase");
    }
}

fn image_fallback(err: &ProviderError) -> String {
    match err {
        ProviderError::NoImageReturned => {
            "I was able to generate an image request, but couldn't retrieve the image URL. \
             Please check your OpenAI API key permissions for image generation."
                .to_string()
        }
        other => format!(
            "I apologize, but I encountered an error while trying to generate the image. Error: {other}"
        ),
    }
}

fn chat_fallback(provider: Provider, err: &ProviderError) -> String {
    match err {
        ProviderError::EmptyCompletion => "No response generated".to_string(),
        other => format!(
            "I apologize, but I encountered an error while contacting {provider}. Error: {other}"
        ),
    }
}

/// First six words of the message, clipped to 50 characters. Used once,
/// when the chat still carries its placeholder title.
pub fn derive_title(message: &str) -> String {
    let title = message
        .split_whitespace()
        .take(TITLE_WORD_COUNT)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        DEFAULT_CHAT_TITLE.to_string()
    } else if title.chars().count() > TITLE_MAX_CHARS {
        let clipped: String = title.chars().take(TITLE_MAX_CHARS).collect();
        format!("{clipped}...")
    } else {
        title
    }
}
