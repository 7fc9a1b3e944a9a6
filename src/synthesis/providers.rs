//! LLM provider clients
//!
//! Two wire shapes: OpenAI-style chat completions (system message plus
//! conversation turns) and Gemini-style generateContent (one prompt
//! string). Credentials are optional at startup; a call without one
//! fails as `MissingCredential` and the caller degrades.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::models::ChatTurn;

use super::estimator::{TokenEstimator, WordBasedEstimator};

// Conversation turns carried into the chat messages array.
const HISTORY_TURNS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No API key configured for {0}")]
    MissingCredential(&'static str),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// OpenAI-compatible chat completions client.
pub struct ChatCompletionProvider {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
}

impl ChatCompletionProvider {
    pub fn new(
        base_url: String,
        api_key: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn complete(
        &self,
        model: &str,
        system_message: &str,
        history: &[ChatTurn],
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, ProviderError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::MissingCredential("openai"))?;

        let mut messages = vec![json!({"role": "system", "content": system_message})];
        let start = history.len().saturating_sub(HISTORY_TURNS);
        for turn in &history[start..] {
            if turn.role == "user" || turn.role == "assistant" {
                messages.push(json!({"role": turn.role, "content": turn.content}));
            }
        }
        messages.push(json!({"role": "user", "content": prompt}));

        debug!(model, message_count = messages.len(), "Chat completion request");

        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(key.expose_secret())
            .json(&json!({
                "model": model,
                "messages": messages,
                "max_tokens": max_tokens,
                "temperature": temperature,
            }))
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("Status {}", status)));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Upstream(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("No completion content".to_string()))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(Completion { text, usage })
    }
}

/// Gemini generateContent client. The prompt travels as a single part;
/// conversation context is already inlined into the prompt text.
pub struct GenerateContentProvider {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    estimator: WordBasedEstimator,
}

impl GenerateContentProvider {
    pub fn new(
        base_url: String,
        api_key: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            estimator: WordBasedEstimator::default(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Completion, ProviderError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::MissingCredential("gemini"))?;

        debug!(model, prompt_chars = prompt.len(), "Generate content request");

        let url = format!(
            "{}/v1/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key.expose_secret())
            .json(&json!({
                "contents": [{"parts": [{"text": prompt}]}],
                "generationConfig": {
                    "maxOutputTokens": max_tokens,
                    "temperature": temperature,
                },
            }))
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("Status {}", status)));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::Upstream(format!(
                "Status {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("No candidate content".to_string()))?;

        let usage = match body.usage_metadata {
            Some(meta) => TokenUsage {
                input_tokens: meta.prompt_token_count,
                output_tokens: meta.candidates_token_count,
                total_tokens: meta.total_token_count,
            },
            None => {
                // No usage metadata; estimate from word counts.
                let input = self.estimator.estimate(prompt) as u64;
                let output = self.estimator.estimate(&text) as u64;
                TokenUsage {
                    input_tokens: input,
                    output_tokens: output,
                    total_tokens: input + output,
                }
            }
        };

        Ok(Completion { text, usage })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}
