//! Text Chunking Module
//!
//! 문장 경계를 기준으로 토큰 한도 내의 청크를 만들고,
//! 직전 청크의 마지막 문장들을 다음 청크 앞에 겹쳐 넣습니다.
//!
//! 토큰 수는 고정 서브워드 토크나이저(cl100k_base BPE)로 계산합니다.

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use regex::Regex;
use tiktoken_rs::CoreBPE;

// ============================================================================
// Token Counting
// ============================================================================

/// 토큰 수 계산 트레이트
pub trait TokenCounter: Send + Sync {
    /// 텍스트의 토큰 수
    fn count(&self, text: &str) -> usize;
}

/// cl100k_base BPE 기반 토큰 카운터
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// cl100k_base 인코딩 로드
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().context("Failed to load cl100k_base tokenizer")?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 청크당 최대 토큰 수 (단일 문장이 이를 넘으면 그대로 하나의 청크가 됨)
    pub max_tokens: usize,
    /// 다음 청크로 이어지는 문장 수
    ///
    /// 청크의 문장 수 이상이면 청크 전체가 다음 청크에 중복됩니다.
    /// 저장량만 늘고 검색 품질은 거의 나아지지 않으니 작게 유지하세요.
    pub overlap_sentences: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_sentences: 1,
        }
    }
}

impl ChunkConfig {
    /// 오버랩 없는 설정
    pub fn without_overlap(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_sentences: 0,
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// SentenceChunker
// ============================================================================

/// 문장 단위 청커
///
/// 문장을 순서대로 버퍼에 쌓다가 다음 문장을 더하면 `max_tokens`를 넘을 때
/// 버퍼를 하나의 청크로 내보내고, 마지막 `overlap_sentences`개 문장으로
/// 다음 버퍼를 시작합니다.
pub struct SentenceChunker {
    config: ChunkConfig,
    counter: Arc<dyn TokenCounter>,
}

impl SentenceChunker {
    /// 설정과 토큰 카운터로 생성
    pub fn new(config: ChunkConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self { config, counter }
    }

    /// 현재 설정
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// 토큰 카운터
    pub fn counter(&self) -> &Arc<dyn TokenCounter> {
        &self.counter
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(
            text,
            self.config.max_tokens,
            self.config.overlap_sentences,
            self.counter.as_ref(),
        )
    }

    fn name(&self) -> &'static str {
        "SentenceChunker"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("valid sentence boundary regex"))
}

/// 문장 분리
///
/// 문장 종결 부호(`.`, `!`, `?`) 뒤에 공백이 오는 위치에서 자릅니다.
/// 종결 부호는 앞 문장에 남고, 빈 문장은 버립니다.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in sentence_boundary().find_iter(text) {
        // 종결 부호는 1바이트 ASCII
        let end = m.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// 텍스트를 문장 경계 청크로 분할
///
/// # Arguments
/// * `text` - 분할할 텍스트
/// * `max_tokens` - 청크당 최대 토큰 수
/// * `overlap_sentences` - 다음 청크로 이어지는 문장 수
/// * `counter` - 토큰 카운터
pub fn chunk_text(
    text: &str,
    max_tokens: usize,
    overlap_sentences: usize,
    counter: &dyn TokenCounter,
) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0;

    for sentence in sentences {
        let sentence_tokens = counter.count(&sentence);

        if !current.is_empty() && current_tokens + sentence_tokens > max_tokens {
            chunks.push(current.join(" "));

            let keep = overlap_sentences.min(current.len());
            current = current.split_off(current.len() - keep);
            current_tokens = current.iter().map(|s| counter.count(s)).sum();
        }

        current.push(sentence);
        current_tokens += sentence_tokens;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성 (cl100k_base, 기본 설정)
pub fn default_chunker() -> Result<Box<dyn Chunker>> {
    sentence_chunker(ChunkConfig::default())
}

/// 문장 청커 생성 (설정 지정)
pub fn sentence_chunker(config: ChunkConfig) -> Result<Box<dyn Chunker>> {
    let counter = Arc::new(TiktokenCounter::cl100k()?);
    Ok(Box::new(SentenceChunker::new(config, counter)))
}

// ============================================================================
// Tests
// ============================================================================
