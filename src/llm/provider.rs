use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single turn of a completion request: system/user/assistant roles, grounded on the
/// teacher's `Gateway` trait request shape (`server/services/groq/service.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct JsonCompletionRequest {
    pub messages: Vec<LlmMessage>,
    pub temperature: f32,
    pub model: String,
    pub allow_web_search: bool,
}

#[derive(Debug, Clone)]
pub struct JsonCompletionResponse {
    pub raw: String,
    pub model_used: String,
    pub latency_ms: u64,
}

/// Shared trait for every JSON-mode LLM call site (C6, C9, C10, C11), grounded on the
/// teacher's `Gateway` trait (one `chat`-shaped method, `async_trait`, model name
/// returned alongside the completion) generalized so a primary/fallback pair can sit
/// behind a single implementation rather than two hardcoded vendor structs.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete_json(&self, request: JsonCompletionRequest) -> anyhow::Result<JsonCompletionResponse>;
}

/// OpenAI-compatible JSON-mode client (Groq/OpenRouter/DeepSeek all speak this dialect),
/// grounded on `server/services/groq/service.rs` and `server/services/solver/mod.rs`'s
/// `response_format: {"type": "json_object"}` request body.
pub struct HttpLlmProvider {
    http: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    fallback_model: Option<String>,
}

impl HttpLlmProvider {
    pub fn new(api_key: Secret<String>, base_url: String, fallback_model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            api_key,
            base_url,
            fallback_model,
        }
    }

    async fn call_model(&self, model: &str, request: &JsonCompletionRequest) -> anyhow::Result<JsonCompletionResponse> {
        let started = std::time::Instant::now();
        let body = ChatCompletionBody {
            model: model.to_string(),
            messages: request.messages.clone(),
            temperature: request.temperature,
            response_format: ResponseFormat { format_type: "json_object".to_string() },
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("empty choices in LLM response"))?;

        Ok(JsonCompletionResponse {
            raw: content,
            model_used: model.to_string(),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn complete_json(&self, request: JsonCompletionRequest) -> anyhow::Result<JsonCompletionResponse> {
        let primary = request.model.clone();
        match self.call_model(&primary, &request).await {
            Ok(response) => Ok(response),
            Err(primary_err) => match &self.fallback_model {
                Some(fallback) => self.call_model(fallback, &request).await.map_err(|fallback_err| {
                    anyhow::anyhow!("primary model failed ({primary_err}); fallback failed ({fallback_err})")
                }),
                None => Err(primary_err),
            },
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<LlmMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: LlmMessage,
}

/// Used when no LLM key is configured; every call fails fast so callers take the
/// documented per-call fallback path (spec.md §7).
pub struct NullLlmProvider;

#[async_trait]
impl LlmProvider for NullLlmProvider {
    async fn complete_json(&self, _request: JsonCompletionRequest) -> anyhow::Result<JsonCompletionResponse> {
        Err(anyhow::anyhow!("no LLM provider configured"))
    }
}
