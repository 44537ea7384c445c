//! Chat-completion client seam.
//!
//! The pipeline treats the LLM as an opaque JSON-producing classifier behind
//! the `ChatClient` trait; `OpenAiChatClient` talks to any
//! `/chat/completions`-compatible endpoint. Responses are untrusted input —
//! callers run them through `extract_json` and the schema gate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One message in a chat-completion conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// An external JSON-producing chat-completion endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Run one completion and return the raw message content.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

// ── OpenAI-compatible implementation ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build a client from `MORAY_LLM_API_KEY` (or `OPENAI_API_KEY`), with
    /// `MORAY_LLM_BASE_URL` and `MORAY_LLM_MODEL` overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("MORAY_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .context("MORAY_LLM_API_KEY (or OPENAI_API_KEY) is not set")?;
        let base_url = std::env::var("MORAY_LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model =
            std::env::var("MORAY_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        Ok(Self::new(base_url, api_key, model))
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.1,
            "response_format": {"type": "json_object"},
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "chat completion returned {status}: {}",
                body.chars().take(300).collect::<String>()
            );
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .context("chat completion response was not valid JSON")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("chat completion had no choices")?;
        Ok(content)
    }
}

/// Pull a JSON object out of an LLM reply: strips markdown code fences and
/// any prose around the outermost `{...}`. Returns None when there is no
/// object to find.
pub fn extract_json(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    // ```json ... ``` fences
    let defenced = if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.split("```").next().unwrap_or(rest)
    } else {
        trimmed
    };

    let start = defenced.find('{')?;
    let end = defenced.rfind('}')?;
    if end < start {
        return None;
    }
    Some(defenced[start..=end].to_string())
}
