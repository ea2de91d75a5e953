// src/llm/image.rs
// Image generation against the OpenAI images endpoint. Takes the
// classified prompt (not the conversation) and normalizes the reply to a
// markdown image reference.

use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::{IMAGE_SIZE, Provider, ProviderError};

const IMAGE_MODEL: &str = "dall-e-3";

pub struct ImageGenerationClient {
    client: Client,
    api_base: String,
}

impl ImageGenerationClient {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds"),
            api_base: api_base.into(),
        }
    }

    /// Request exactly one image and return it as embeddable markdown.
    /// The endpoint may answer with a hosted URL or inline base64; both
    /// normalize to the same shape.
    pub async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": IMAGE_MODEL,
            "prompt": prompt,
            "n": 1,
            "size": IMAGE_SIZE,
            "quality": "standard",
            "response_format": "url",
        });

        debug!(prompt_chars = prompt.len(), "image generation request");

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.api_base))
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

        let url = raw["data"][0]["url"]
            .as_str()
            .map(str::to_string)
            .or_else(|| {
                raw["data"][0]["b64_json"]
                    .as_str()
                    .map(|b64| format!("data:image/png;base64,{b64}"))
            });

        match url {
            Some(url) => Ok(format!("![Generated Image]({url})")),
            None => Err(ProviderError::NoImageReturned),
        }
    }
}
