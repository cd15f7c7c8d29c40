use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use shopwise_core::config::{LlmConfig, LlmProvider};
use thiserror::Error;
use tracing::debug;

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 400;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("{provider} requires an api key")]
    MissingApiKey { provider: &'static str },
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
    #[error("llm returned an empty response")]
    EmptyResponse,
}

pub fn provider_name(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "openai",
        LlmProvider::Anthropic => "anthropic",
        LlmProvider::Ollama => "ollama",
    }
}

/// Chat-style completion over the provider's HTTP API.
pub struct HttpLlmClient {
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
    client: Client,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let needs_key = matches!(config.provider, LlmProvider::OpenAi | LlmProvider::Anthropic);
        if needs_key && config.api_key.is_none() {
            return Err(LlmError::MissingApiKey { provider: provider_name(config.provider) });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Http(error.to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let (url, body) = request_parts(self.provider, &self.base_url, &self.model, prompt);
        let request = self.client.post(url).json(&body);

        match (self.provider, &self.api_key) {
            (LlmProvider::Anthropic, Some(key)) => request
                .header("x-api-key", key.expose_secret())
                .header("anthropic-version", ANTHROPIC_VERSION),
            (_, Some(key)) => request.bearer_auth(key.expose_secret()),
            (_, None) => request,
        }
    }

    async fn send(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.request(prompt).send().await.map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::Http(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http(format!(
                "HTTP {status} from {}",
                provider_name(self.provider)
            )));
        }

        let payload: Value =
            response.json().await.map_err(|error| LlmError::InvalidResponse(error.to_string()))?;
        extract_text(self.provider, &payload)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            event_name = "llm.request",
            provider = provider_name(self.provider),
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "sending completion request"
        );
        Ok(self.send(prompt).await?)
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => OPENAI_BASE_URL,
        LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
        LlmProvider::Ollama => OLLAMA_BASE_URL,
    }
}

fn request_parts(provider: LlmProvider, base_url: &str, model: &str, prompt: &str) -> (String, Value) {
    match provider {
        LlmProvider::OpenAi => (
            format!("{base_url}/v1/chat/completions"),
            json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": MAX_TOKENS,
            }),
        ),
        LlmProvider::Anthropic => (
            format!("{base_url}/v1/messages"),
            json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "messages": [{ "role": "user", "content": prompt }],
            }),
        ),
        LlmProvider::Ollama => (
            format!("{base_url}/api/generate"),
            json!({ "model": model, "prompt": prompt, "stream": false }),
        ),
    }
}

fn extract_text(provider: LlmProvider, payload: &Value) -> Result<String, LlmError> {
    let text = match provider {
        LlmProvider::OpenAi => payload
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string),
        LlmProvider::Anthropic => payload.get("content").and_then(Value::as_array).map(|blocks| {
            blocks
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        }),
        LlmProvider::Ollama => {
            payload.get("response").and_then(Value::as_str).map(str::to_string)
        }
    };

    let text = text.ok_or_else(|| LlmError::InvalidResponse(payload.to_string()))?;
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.trim().to_string())
}
