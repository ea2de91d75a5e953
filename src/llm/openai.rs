// src/llm/openai.rs
// OpenAI Chat Completions adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::{
    ChatAdapter, DEFAULT_TEMPERATURE, MAX_COMPLETION_TOKENS, Provider, ProviderError,
};
use crate::turn::capability::ModelCapability;
use crate::turn::context::{AssembledContext, ContentPart, ContextEntry, MessageBody};

pub struct OpenAiChatAdapter {
    client: Client,
    api_base: String,
}

impl OpenAiChatAdapter {
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
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:{media_type};base64,{data}"),
                                "detail": "high"
                            }
                        }),
                    })
                    .collect();
                json!(parts)
            }
        };

        json!({ "role": entry.role.as_str(), "content": content })
    }
}

#[async_trait]
impl ChatAdapter for OpenAiChatAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn invoke(
        &self,
        model: &str,
        capability: &ModelCapability,
        context: &AssembledContext,
        api_key: &str,
    ) -> Result<String, ProviderError> {
        let messages: Vec<Value> = context.entries.iter().map(Self::entry_to_message).collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
        });

        // Reasoning-tier models reject both parameters outright.
        if capability.supports_sampling_params {
            body["max_tokens"] = json!(MAX_COMPLETION_TOKENS);
            body["temperature"] = json!(DEFAULT_TEMPERATURE);
        }

        debug!(model, entries = context.entries.len(), "OpenAI chat request");

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(Provider::OpenAi, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: Provider::OpenAi,
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::transport(Provider::OpenAi, e))?;

        raw["choices"][0]["message"]["content"]
            .as_str()
            .filter(|content| !content.is_empty())
            .map(str::to_string)
            .ok_or(ProviderError::EmptyCompletion)
    }
}
