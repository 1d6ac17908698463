use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AnswerGenerator, ChatMessage, ModelOptions};
use crate::config::AnswerConfig;
use crate::error::GenerationError;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI Chat Completions 백엔드
pub struct OpenAiChat {
    config: AnswerConfig,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: AnswerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build OpenAI HTTP client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ModelOptions,
    ) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages,
        };
        let resp = self
            .client
            .post(&self.config.url)
            .bearer_auth(self.config.api_key.trim())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(GenerationError::Api { status, message });
        }
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let answer = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();
        if answer.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(answer)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
