//! LLM 모듈 - 답변 생성 백엔드
//!
//! 두 개의 동등한 백엔드(OpenAI, Anthropic)를 같은 트레이트 뒤에 둡니다.
//! 어느 쪽을 쓸지는 설정 시점에 한 번 정하고 파이프라인에 주입합니다.

mod anthropic;
mod openai;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::{AnswerConfig, LlmBackend};
use crate::error::GenerationError;

pub use anthropic::{AnthropicChat, ANTHROPIC_MESSAGES_URL};
pub use openai::{OpenAiChat, OPENAI_CHAT_URL};

// ============================================================================
// Types
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 대화 메시지
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// 모델 옵션
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub temperature: f32,
    /// 최대 출력 토큰 수
    pub max_tokens: u32,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 500,
        }
    }
}

// ============================================================================
// AnswerGenerator Trait
// ============================================================================

/// 답변 생성 서비스 트레이트
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// 메시지 목록으로 답변 생성
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ModelOptions,
    ) -> std::result::Result<String, GenerationError>;

    /// 백엔드 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정된 백엔드로 답변 생성기 생성
pub fn create_generator(config: &AnswerConfig) -> Result<Arc<dyn AnswerGenerator>> {
    let generator: Arc<dyn AnswerGenerator> = match config.backend {
        LlmBackend::OpenAi => Arc::new(OpenAiChat::new(config.clone())?),
        LlmBackend::Anthropic => Arc::new(AnthropicChat::new(config.clone())?),
    };

    tracing::info!(
        "Using {} for answer generation (model: {})",
        config.backend,
        config.model
    );

    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::system("be brief")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }

    #[test]
    fn test_create_generator_per_backend() {
        let openai = create_generator(&AnswerConfig::new(LlmBackend::OpenAi, "k".to_string()))
            .unwrap();
        assert_eq!(openai.name(), "openai");

        let anthropic =
            create_generator(&AnswerConfig::new(LlmBackend::Anthropic, "k".to_string()))
                .unwrap();
        assert_eq!(anthropic.name(), "anthropic");
    }
}
