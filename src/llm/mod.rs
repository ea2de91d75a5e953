// src/llm/mod.rs
// Provider adapter trait and shared wire-level types.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::turn::capability::ModelCapability;
use crate::turn::context::AssembledContext;

pub mod anthropic;
pub mod image;
pub mod openai;

pub use anthropic::AnthropicChatAdapter;
pub use image::ImageGenerationClient;
pub use openai::OpenAiChatAdapter;

/// Completion cap for the non-reasoning chat tier. Reasoning-tier models
/// reject the parameter and get no cap at all.
pub const MAX_COMPLETION_TOKENS: u32 = 1000;

/// Sampling temperature for the non-reasoning chat tier.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Fixed output resolution for image generation.
pub const IMAGE_SIZE: &str = "1024x1024";

/// The upstream services we can dispatch a turn to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "OpenAI"),
            Provider::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// Everything that can go wrong between "payload assembled" and "reply
/// normalized". `MissingCredential` is a fail-fast gate; the rest are
/// operational conditions the orchestrator downgrades to fallback text.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} API key not configured")]
    MissingCredential(Provider),
    #[error("provider returned an empty completion")]
    EmptyCompletion,
    #[error("image endpoint returned neither a URL nor image data")]
    NoImageReturned,
    #[error("provider request timed out")]
    Timeout,
    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },
    #[error("transport error talking to {provider}: {message}")]
    Transport { provider: Provider, message: String },
}

impl ProviderError {
    /// Fold a reqwest failure into the taxonomy, keeping timeouts distinct.
    pub fn transport(provider: Provider, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport {
                provider,
                message: err.to_string(),
            }
        }
    }
}

/// Per-turn provider credentials. Request-supplied keys win; the
/// server-wide defaults (from config) fill the gaps. No process-global
/// key state anywhere.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

impl ProviderKeys {
    pub fn merged_with(&self, defaults: &ProviderKeys) -> ProviderKeys {
        ProviderKeys {
            openai: self.openai.clone().or_else(|| defaults.openai.clone()),
            anthropic: self.anthropic.clone().or_else(|| defaults.anthropic.clone()),
        }
    }

    pub fn key_for(&self, provider: Provider) -> Result<&str, ProviderError> {
        let key = match provider {
            Provider::OpenAi => self.openai.as_deref(),
            Provider::Anthropic => self.anthropic.as_deref(),
        };
        key.filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingCredential(provider))
    }
}

/// Unified chat adapter interface. Each implementation translates an
/// assembled context into its provider's native request shape and
/// normalizes the reply down to plain text.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Which provider this adapter fronts.
    fn provider(&self) -> Provider;

    async fn invoke(
        &self,
        model: &str,
        capability: &ModelCapability,
        context: &AssembledContext,
        api_key: &str,
    ) -> Result<String, ProviderError>;
}
