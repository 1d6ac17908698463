//! docqa-rag - 문서 기반 질의응답 RAG 시스템
//!
//! 수집한 문서를 문장 단위 청크로 나눠 임베딩하고, 질문과 가장 가까운 청크를
//! 컨텍스트로 붙여 LLM에 답변을 요청합니다.
//! 모든 상태는 메모리에만 있으며 프로세스가 끝나면 사라집니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use config::{AnswerConfig, EmbeddingConfig, LlmBackend, RagConfig};
pub use embedding::{
    create_embedding_service, EmbeddingOutcome, EmbeddingProvider, EmbeddingService,
    OpenAiEmbedding,
};
pub use error::{EmbeddingError, GenerationError, RagError};
pub use knowledge::{
    default_chunker, AnswerResult, AnswerStatus, ChunkConfig, ChunkRecord, Chunker,
    IngestReport, PipelineOptions, RetrievalPipeline, SearchResult, SentenceChunker,
    SimilarityMetric, TiktokenCounter, TokenCounter, VectorStore,
};
pub use llm::{
    create_generator, AnswerGenerator, AnthropicChat, ChatMessage, ModelOptions, OpenAiChat, Role,
};
