//! 에러 타입
//!
//! 외부 서비스(임베딩, 답변 생성) 실패와 호출자 입력 오류를 구분합니다.
//! 임베딩 실패는 `EmbeddingProvider` 안에서, 답변 생성 실패는
//! `RetrievalPipeline` 경계에서 복구되므로 호출자에게는 `RagError`만 노출됩니다.

use thiserror::Error;

/// 코어 API가 호출자에게 반환하는 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 빈 문서, 빈 질문 등 잘못된 입력
    #[error("validation error: {0}")]
    Validation(String),
}

/// 임베딩 서비스 호출 실패
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// 네트워크 오류 또는 타임아웃
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 응답 본문에 에러 필드가 있거나 비정상 상태 코드
    #[error("embedding API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 파싱할 수 없는 응답
    #[error("malformed embedding response: {0}")]
    Malformed(String),

    /// 선언된 차원과 다른 벡터
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// 답변 생성 서비스 호출 실패
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion response contained no text")]
    EmptyResponse,

    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl EmbeddingError {
    /// 타임아웃으로 인한 실패인지 여부
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}
