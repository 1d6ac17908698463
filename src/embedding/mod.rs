//! 임베딩 모듈 - 텍스트 벡터화
//!
//! - `EmbeddingService`: 외부 임베딩 서비스 인터페이스 (OpenAI 구현 포함)
//! - `EmbeddingProvider`: 요청 단위 캐시와 영벡터 폴백을 갖춘 래퍼
//!
//! ## 사용법
//! ```rust,ignore
//! let config = RagConfig::from_env()?;
//! let service = create_embedding_service(&config.embedding)?;
//! let provider = EmbeddingProvider::new(service);
//! let embedding = provider.embed("Hello, world!").await;
//! ```

mod openai;
mod provider;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

pub use openai::{OpenAiEmbedding, OPENAI_EMBED_URL};
pub use provider::{char_budget, zero_vector, EmbeddingOutcome, EmbeddingProvider};

/// 임베딩 서비스 최대 입력 토큰 수 (text-embedding-3 계열)
pub const MAX_INPUT_TOKENS: usize = 8191;

/// 토큰당 평균 문자 수 (입력 길이 어림용)
pub const AVG_CHARS_PER_TOKEN: f32 = 4.0;

// ============================================================================
// EmbeddingService Trait
// ============================================================================

/// 외부 임베딩 서비스 트레이트
///
/// 호출 한 번이 외부 요청 한 번입니다. 캐시와 폴백은 `EmbeddingProvider`가 담당합니다.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed_text(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 최대 입력 토큰 수
    fn max_input_tokens(&self) -> usize {
        MAX_INPUT_TOKENS
    }

    /// 서비스 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정으로 임베딩 서비스 생성
pub fn create_embedding_service(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>> {
    let service = OpenAiEmbedding::new(config.clone())?;
    tracing::info!(
        "Using OpenAI embedding (model: {}, dimension: {})",
        config.model,
        config.dimension
    );
    Ok(Arc::new(service))
}
