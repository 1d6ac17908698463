//! 테스트용 가짜 외부 서비스

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::{EmbeddingService, MAX_INPUT_TOKENS};
use crate::error::{EmbeddingError, GenerationError};
use crate::knowledge::{TokenCounter, NO_CONTEXT};
use crate::llm::{AnswerGenerator, ChatMessage, ModelOptions};

/// 공백 단위 토큰 카운터
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

const KEYWORDS: [&str; 8] = ["cat", "dog", "bird", "fish", "tree", "car", "sun", "moon"];

/// 키워드 빈도 벡터를 돌려주는 임베딩 서비스
///
/// 차원 i는 `KEYWORDS[i]`를 포함하는 단어 수입니다.
pub struct FakeEmbeddingService {
    dimension: usize,
    max_input_tokens: usize,
    calls: AtomicUsize,
    failing: AtomicBool,
    last_input_len: Mutex<Option<usize>>,
}

impl FakeEmbeddingService {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension <= KEYWORDS.len());
        Self {
            dimension,
            max_input_tokens: MAX_INPUT_TOKENS,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            last_input_len: Mutex::new(None),
        }
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = max_input_tokens;
        self
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        KEYWORDS[..self.dimension]
            .iter()
            .map(|k| words.iter().filter(|w| w.contains(k)).count() as f32)
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn last_input_len(&self) -> Option<usize> {
        *self.last_input_len.lock().unwrap()
    }
}

#[async_trait]
impl EmbeddingService for FakeEmbeddingService {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input_len.lock().unwrap() = Some(text.chars().count());

        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    fn name(&self) -> &str {
        "fake-embedding"
    }
}

/// 받은 메시지를 기록하는 답변 생성기
///
/// 컨텍스트가 비어 있으면 정보 부족 답변을 돌려줍니다.
pub struct RecordingGenerator {
    calls: AtomicUsize,
    failing: AtomicBool,
    last_messages: Mutex<Option<Vec<ChatMessage>>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            last_messages: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn last_messages(&self) -> Option<Vec<ChatMessage>> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: &ModelOptions,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock().unwrap() = Some(messages.to_vec());

        if self.failing.load(Ordering::SeqCst) {
            return Err(GenerationError::Api {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        let has_context = messages
            .first()
            .map(|m| !m.content.contains(NO_CONTEXT))
            .unwrap_or(false);
        if has_context {
            Ok("Here is what the context says.".to_string())
        } else {
            Ok("I do not have enough information to answer that.".to_string())
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}
