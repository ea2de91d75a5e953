// src/llm/anthropic.rs
// Anthropic Messages API adapter. System entries are lifted out of the
// message list into the top-level `system` parameter, which is how this
// API wants them.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::{ChatAdapter, MAX_COMPLETION_TOKENS, Provider, ProviderError};
use crate::turn::capability::ModelCapability;
use crate::turn::context::{AssembledContext, ContentPart, ContextEntry, MessageBody, Role};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicChatAdapter {
    client: Client,
    api_base: String,
}

impl AnthropicChatAdapter {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds"),
            api_base: api_base.into(),
        }
    }

    fn entry_to_message(entry: &ContextEntry) -> Value {
        let content = match &entry.body {
            MessageBody::Text(text) => json!(text),
            MessageBody::Parts(parts) => {
                let parts: Vec<Value> = parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
                        ContentPart::Image { media_type, data } => json!({
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": media_type,
                                "data": data
                            }
                        }),
                    })
                    .collect();
                json!(parts)
            }
        };

        json!({ "role": entry.role.as_str(), "content": content })
    }

    fn entry_text(entry: &ContextEntry) -> &str {
        match &entry.body {
            MessageBody::Text(text) => text,
            MessageBody::Parts(_) => "",
        }
    }
}

#[async_trait]
impl ChatAdapter for AnthropicChatAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn invoke(
        &self,
        model: &str,
        _capability: &ModelCapability,
        context: &AssembledContext,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let system: Vec<&str> = context
            .entries
            .iter()
            .filter(|e| e.role == Role::System)
            .map(Self::entry_text)
            .filter(|text| !text.is_empty())
            .collect();

        let messages: Vec<Value> = context
            .entries
            .iter()
            .filter(|e| e.role != Role::System)
            .map(Self::entry_to_message)
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "messages": messages,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }

        debug!(model, entries = context.entries.len(), "Anthropic chat request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(Provider::Anthropic, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: Provider::Anthropic,
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(Provider::Anthropic, e))?;

        raw["content"][0]["text"]
            .as_str()
            .filter(|content| !content.is_empty())
            .map(str::to_string)
            .ok_or(ProviderError::EmptyCompletion)
    }
}
