//! Knowledge 모듈 - 검색 증강 생성의 검색 부분
//!
//! - Chunker: 문장 경계 + 토큰 한도 + 문장 오버랩 분할
//! - VectorStore: 인메모리 전수 비교 top-k 검색
//! - Pipeline: 수집(청킹 → 임베딩 → 저장)과 질의(검색 → 답변 생성) 조율

mod chunker;
mod pipeline;
mod vector;

// Re-exports
pub use chunker::{
    chunk_text, default_chunker, sentence_chunker, split_sentences, ChunkConfig, Chunker,
    SentenceChunker, TiktokenCounter, TokenCounter,
};
pub use pipeline::{
    build_context, build_messages, AnswerResult, AnswerStatus, IngestReport, PipelineOptions,
    RetrievalPipeline, NO_CONTEXT,
};
pub use vector::{
    cosine_similarity, inner_product, ChunkRecord, SearchResult, SimilarityMetric, VectorStore,
    EMBEDDING_DIMENSION,
};
