//! 캐시 + 폴백 임베딩 프로바이더
//!
//! 요청마다 새로 만들어 쓰는 짧은 수명의 래퍼입니다.
//! 같은 텍스트는 한 번만 외부 서비스로 보내고, 실패하면 영벡터를 돌려줍니다.
//! 폴백 벡터는 캐시하지 않으므로 같은 텍스트를 다시 요청하면 외부 호출을 다시 시도합니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{EmbeddingService, AVG_CHARS_PER_TOKEN};
use crate::error::EmbeddingError;
use crate::text::clip_chars;

// ============================================================================
// Types
// ============================================================================

/// 임베딩 결과
///
/// 정상 / 캐시 적중 / 폴백(품질 저하)을 구분합니다.
#[derive(Debug)]
pub enum EmbeddingOutcome {
    /// 외부 서비스에서 새로 받은 벡터
    Fresh(Vec<f32>),
    /// 캐시에서 꺼낸 벡터
    Cached(Vec<f32>),
    /// 외부 호출 실패로 대체된 영벡터
    Degraded {
        vector: Vec<f32>,
        error: EmbeddingError,
    },
}

impl EmbeddingOutcome {
    /// 벡터 꺼내기
    pub fn into_vector(self) -> Vec<f32> {
        match self {
            Self::Fresh(v) | Self::Cached(v) => v,
            Self::Degraded { vector, .. } => vector,
        }
    }

    /// 폴백 여부
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

// ============================================================================
// EmbeddingProvider
// ============================================================================

/// 요청 단위 임베딩 프로바이더
///
/// 캐시는 인스턴스마다 따로 가지며 제거 정책이 없습니다.
pub struct EmbeddingProvider {
    service: Arc<dyn EmbeddingService>,
    cache: Mutex<HashMap<String, Vec<f32>>>,
    char_budget: usize,
}

impl EmbeddingProvider {
    /// 외부 서비스 핸들로 생성
    pub fn new(service: Arc<dyn EmbeddingService>) -> Self {
        let char_budget = char_budget(service.max_input_tokens());
        Self {
            service,
            cache: Mutex::new(HashMap::new()),
            char_budget,
        }
    }

    /// 임베딩 차원
    pub fn dimension(&self) -> usize {
        self.service.dimension()
    }

    /// 캐시된 텍스트 수
    pub fn cached_count(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 텍스트 임베딩 (실패해도 에러를 내지 않음)
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        self.embed_detailed(text).await.into_vector()
    }

    /// 텍스트 임베딩 (결과 종류 포함)
    ///
    /// 캐시 키는 자르기 전의 원문입니다.
    pub async fn embed_detailed(&self, text: &str) -> EmbeddingOutcome {
        if let Some(vector) = self.cached(text) {
            tracing::debug!("Embedding cache hit ({} chars)", text.len());
            return EmbeddingOutcome::Cached(vector);
        }

        let input = clip_chars(text, self.char_budget);

        // 외부 호출 동안에는 캐시 잠금을 잡지 않음
        match self.service.embed_text(input).await {
            Ok(vector) => {
                self.cache
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(text.to_string(), vector.clone());
                EmbeddingOutcome::Fresh(vector)
            }
            Err(error) => {
                if error.is_timeout() {
                    tracing::warn!(
                        "Embedding via {} timed out, using zero vector",
                        self.service.name()
                    );
                } else {
                    tracing::warn!(
                        "Embedding via {} failed, using zero vector: {}",
                        self.service.name(),
                        error
                    );
                }
                EmbeddingOutcome::Degraded {
                    vector: zero_vector(self.service.dimension()),
                    error,
                }
            }
        }
    }

    fn cached(&self, text: &str) -> Option<Vec<f32>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
            .cloned()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 폴백용 영벡터
pub fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

/// 최대 토큰 수로부터 입력 문자 예산 계산 (토큰당 평균 문자 수 어림)
pub fn char_budget(max_input_tokens: usize) -> usize {
    (max_input_tokens as f32 * AVG_CHARS_PER_TOKEN) as usize
}

// ============================================================================
// Tests
// ============================================================================
