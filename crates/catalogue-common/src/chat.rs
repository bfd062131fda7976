//! Client for an OpenAI-compatible chat-completions endpoint.
//!
//! The hosted API is treated as an opaque collaborator: one `POST
//! /chat/completions` per call, bounded retries with exponential backoff on
//! transient failures, and error bodies captured up to a byte limit so a
//! misbehaving upstream cannot flood the logs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ChatError;

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl ChatConfig {
    /// Optional:
    /// - `CHAT_BASE_URL` (default "https://api.openai.com/v1")
    /// - `OPENAI_API_KEY` (no auth header when unset, for local hosts)
    /// - `CHAT_MODEL` (default "gpt-4o-mini")
    /// - `CHAT_TIMEOUT_SECS`, `CHAT_MAX_RETRIES`, `CHAT_RETRY_INITIAL_MS`,
    ///   `CHAT_RETRY_MAX_MS`, `CHAT_MAX_ERROR_BODY_BYTES`
    pub fn from_env() -> Self {
        let base_url = std::env::var("CHAT_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        let timeout = env_u64("CHAT_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        let max_retries = env_u64("CHAT_MAX_RETRIES").map(|n| n as u32).unwrap_or(3);

        let initial_backoff = env_u64("CHAT_RETRY_INITIAL_MS")
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(200));

        let max_backoff = env_u64("CHAT_RETRY_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_millis(5_000));

        let max_error_body_bytes =
            env_u64("CHAT_MAX_ERROR_BODY_BYTES").map(|n| n as usize).unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorEnvelope {
    error: UpstreamErrorObject,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorObject {
    message: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    config: ChatConfig,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .user_agent("course-discovery/chat")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Run one chat completion against the configured model and return the
    /// assistant text.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let response: ChatCompletionResponse = self
            .with_retry(|| {
                let req = request.clone();
                let url = url.clone();
                async move {
                    let mut builder = self.http.post(&url).timeout(self.config.timeout).json(&req);
                    if let Some(key) = &self.config.api_key {
                        builder = builder.bearer_auth(key);
                    }
                    let resp = builder.send().await?;
                    self.parse_json(resp).await
                }
            })
            .await?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or(ChatError::EmptyReply)
    }

    async fn parse_json<T: for<'de> Deserialize<'de>>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ChatError> {
        if resp.status().is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let status = resp.status();
        let body = self.read_limited_body(resp).await;
        if let Ok(parsed) = serde_json::from_str::<UpstreamErrorEnvelope>(&body) {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| "unknown upstream error".to_string());
            return Err(ChatError::Upstream { status, message });
        }
        Err(ChatError::UpstreamBody { status, body })
    }

    async fn read_limited_body(&self, resp: reqwest::Response) -> String {
        match resp.bytes().await {
            Ok(mut b) => {
                if b.len() > self.config.max_error_body_bytes {
                    b.truncate(self.config.max_error_body_bytes);
                }
                String::from_utf8_lossy(&b).to_string()
            }
            Err(e) => {
                warn!(error = %e, "failed to read upstream error body");
                "<failed to read error body>".to_string()
            }
        }
    }

    async fn with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, ChatError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ChatError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !is_transient(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "chat request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn is_transient(err: &ChatError) -> bool {
    match err {
        ChatError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode(),
        ChatError::Upstream { status, .. } | ChatError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        ChatError::InvalidJson(_) | ChatError::EmptyReply => false,
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

// Subsecond clock noise stands in for real randomness here.
fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    (now.subsec_nanos() as u64) % (max_inclusive + 1)
}
