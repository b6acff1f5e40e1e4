//! OpenAI-compatible chat-completions transport.
//!
//! One dialect covers every deployment target we care about (Gemini's
//! OpenAI endpoint, Groq, OpenRouter); only `base_url` and the key change.

use std::env;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use vetta_config::LlmConfig;

use crate::{LlmError, LlmTransport};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn from_config(config: &LlmConfig) -> Self {
        let api_key = env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl LlmTransport for HttpTransport {
    async fn generate(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(LlmError::Transport(
                "llm api key missing; set the configured api_key_env variable".to_string(),
            ));
        };

        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let payload = json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let endpoint = format!("{}/chat/completions", self.base_url);
        debug!(model, endpoint = %endpoint, "dispatching chat completion");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::classify(Some(status.as_u16()), body.to_string()));
        }

        body.get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .filter(|content| !content.trim().is_empty())
            .map(ToString::to_string)
            .ok_or(LlmError::EmptyResponse)
    }
}
