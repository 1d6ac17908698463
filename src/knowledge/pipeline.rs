//! 검색 파이프라인 - 청킹 → 임베딩 → 저장 / 검색 → 답변 생성
//!
//! 수집: 텍스트 → Chunker → EmbeddingProvider(청크별) → VectorStore::add
//! 질의: 질문 → EmbeddingProvider → VectorStore::search → 컨텍스트 → AnswerGenerator
//!
//! 임베딩 실패는 영벡터로 대체되어 수집과 질의는 항상 진행되며,
//! 답변 생성 실패는 사용자에게 보여줄 텍스트 답변으로 바뀝니다.

use std::sync::Arc;

use serde::Serialize;

use crate::embedding::{EmbeddingProvider, EmbeddingService};
use crate::error::RagError;
use crate::llm::{AnswerGenerator, ChatMessage, ModelOptions};
use crate::text::truncate_text;

use super::chunker::Chunker;
use super::vector::{SearchResult, VectorStore};

/// 컨텍스트가 없을 때 컨텍스트 블록 자리에 들어가는 문구
pub const NO_CONTEXT: &str = "(no relevant context found)";

// ============================================================================
// Types
// ============================================================================

/// 파이프라인 옵션
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 기본 검색 개수
    pub default_top_k: usize,
    /// 미리보기 최대 문자 수
    pub preview_chars: usize,
    /// 미리보기 최대 개수
    pub max_previews: usize,
    /// 컨텍스트 블록의 청크별 최대 문자 수 (None이면 자르지 않음)
    pub context_chars: Option<usize>,
    /// 답변 생성 모델 옵션
    pub model_options: ModelOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            default_top_k: 3,
            preview_chars: 200,
            max_previews: 3,
            context_chars: None,
            model_options: ModelOptions::default(),
        }
    }
}

/// 수집 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// 저장된 청크 수
    pub chunks_created: usize,
    /// 영벡터로 대체된 청크 수
    pub degraded_chunks: usize,
}

/// 답변 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// 정상 답변
    Answered,
    /// 답변은 생성됐지만 질문 임베딩이 폴백됨 (검색 품질 저하)
    Degraded,
    /// 답변 생성 실패 (answer에 실패 설명)
    Failed,
}

/// 질의 결과
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub answer: String,
    /// 사용된 컨텍스트 청크 수
    pub context_used: usize,
    /// 상위 청크 미리보기
    pub context_preview: Vec<String>,
    pub status: AnswerStatus,
}

// ============================================================================
// RetrievalPipeline
// ============================================================================

/// 검색 증강 생성 파이프라인
///
/// 저장소는 프로세스 시작 시 한 번 만들어 `Arc`로 공유합니다.
/// 임베딩 캐시는 `ingest` / `ask` 호출마다 새로 만듭니다.
pub struct RetrievalPipeline {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingService>,
    generator: Arc<dyn AnswerGenerator>,
    chunker: Box<dyn Chunker>,
    options: PipelineOptions,
}

impl RetrievalPipeline {
    /// 새 파이프라인 생성
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingService>,
        generator: Arc<dyn AnswerGenerator>,
        chunker: Box<dyn Chunker>,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            chunker,
            options: PipelineOptions::default(),
        }
    }

    /// 옵션 지정
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// 공유 저장소
    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// 옵션
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// 저장된 청크 수
    pub fn store_size(&self) -> usize {
        self.store.size()
    }

    /// 문서 수집
    ///
    /// 청크 순서대로 임베딩하여 저장합니다. 중간 청크의 임베딩이 실패해도
    /// 영벡터로 저장되며, 이미 저장된 청크는 되돌리지 않습니다.
    pub async fn ingest(&self, raw_text: &str) -> Result<IngestReport, RagError> {
        if raw_text.trim().is_empty() {
            return Err(RagError::Validation("text must not be empty".to_string()));
        }

        let chunks = self.chunker.chunk(raw_text);
        let provider = EmbeddingProvider::new(Arc::clone(&self.embedder));

        let mut report = IngestReport {
            chunks_created: 0,
            degraded_chunks: 0,
        };

        for chunk in chunks {
            let outcome = provider.embed_detailed(&chunk).await;
            if outcome.is_degraded() {
                report.degraded_chunks += 1;
            }
            self.store.add(chunk, outcome.into_vector());
            report.chunks_created += 1;
        }

        tracing::info!(
            "Ingested {} chunks ({} degraded) via {}, store size {}",
            report.chunks_created,
            report.degraded_chunks,
            self.chunker.name(),
            self.store.size()
        );

        Ok(report)
    }

    /// 기본 top_k로 질의
    pub async fn ask_default(&self, query: &str) -> Result<AnswerResult, RagError> {
        self.ask(query, self.options.default_top_k).await
    }

    /// 질의
    ///
    /// 빈 질문만 에러이며, 그 외에는 항상 결과를 반환합니다.
    pub async fn ask(&self, query: &str, top_k: usize) -> Result<AnswerResult, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::Validation("query must not be empty".to_string()));
        }

        let provider = EmbeddingProvider::new(Arc::clone(&self.embedder));
        let outcome = provider.embed_detailed(query).await;
        let degraded = outcome.is_degraded();

        let results = self.store.search(&outcome.into_vector(), top_k);
        let messages = build_messages(query, &results, self.options.context_chars);

        let context_preview = results
            .iter()
            .take(self.options.max_previews)
            .map(|r| truncate_text(&r.record.text, self.options.preview_chars))
            .collect();

        let (answer, status) = match self
            .generator
            .complete(&messages, &self.options.model_options)
            .await
        {
            Ok(answer) if degraded => (answer, AnswerStatus::Degraded),
            Ok(answer) => (answer, AnswerStatus::Answered),
            Err(e) => {
                tracing::warn!("Answer generation via {} failed: {}", self.generator.name(), e);
                (
                    format!("Sorry, I could not generate an answer: {}", e),
                    AnswerStatus::Failed,
                )
            }
        };

        Ok(AnswerResult {
            answer,
            context_used: results.len(),
            context_preview,
            status,
        })
    }
}

// ============================================================================
// Prompt Building
// ============================================================================

/// 번호 붙은 컨텍스트 블록 (1부터)
pub fn build_context(results: &[SearchResult], max_chars: Option<usize>) -> String {
    if results.is_empty() {
        return NO_CONTEXT.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let text = match max_chars {
                Some(limit) => truncate_text(&r.record.text, limit),
                None => r.record.text.clone(),
            };
            format!("[{}] {}", i + 1, text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// system(지시 + 컨텍스트) + user(질문) 메시지 구성
pub fn build_messages(
    query: &str,
    results: &[SearchResult],
    max_chars: Option<usize>,
) -> Vec<ChatMessage> {
    let system = format!(
        "You are a helpful assistant that answers questions using only the provided context.\n\
         If the context does not contain the answer, say that you do not have enough \
         information to answer.\n\
         Be concise and refer to context entries by their number when useful.\n\n\
         Context:\n{}",
        build_context(results, max_chars)
    );

    vec![ChatMessage::system(system), ChatMessage::user(query)]
}

// ============================================================================
// Tests
// ============================================================================
