//! 설정 - 환경변수 기반
//!
//! 프로세스 시작 시 한 번 읽고, 백엔드 선택도 이때 끝냅니다.
//!
//! | 변수 | 기본값 |
//! |---|---|
//! | `OPENAI_API_KEY` | (임베딩에 필수) |
//! | `ANTHROPIC_API_KEY` | (Anthropic 백엔드에 필수) |
//! | `RAG_LLM_PROVIDER` | `openai` (또는 `anthropic`) |
//! | `RAG_EMBEDDING_MODEL` | `text-embedding-3-small` |
//! | `RAG_EMBEDDING_DIMENSION` | `1536` |
//! | `RAG_CHAT_MODEL` | 백엔드별 기본 모델 |
//! | `RAG_CHUNK_MAX_TOKENS` | `500` |
//! | `RAG_CHUNK_OVERLAP` | `1` |
//! | `RAG_TOP_K` | `3` |
//! | `RAG_SIMILARITY` | `dot` / `cosine` |
//! | `RAG_TEMPERATURE` | `0.3` |
//! | `RAG_MAX_OUTPUT_TOKENS` | `500` |
//! | `RAG_HTTP_TIMEOUT_SECS` | 임베딩 30, 답변 60 |

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::embedding::{MAX_INPUT_TOKENS, OPENAI_EMBED_URL};
use crate::knowledge::{ChunkConfig, SimilarityMetric, EMBEDDING_DIMENSION};
use crate::llm::{ModelOptions, ANTHROPIC_MESSAGES_URL, OPENAI_CHAT_URL};

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_CHAT_MODEL: &str = "claude-3-5-haiku-latest";

const EMBEDDING_TIMEOUT_SECS: u64 = 30;
const COMPLETION_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Types
// ============================================================================

/// 답변 생성 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Anthropic,
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for LlmBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => bail!("Unknown LLM provider '{}'. Use 'openai' or 'anthropic'", other),
        }
    }
}

/// 임베딩 서비스 설정
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub url: String,
    pub model: String,
    pub dimension: usize,
    pub max_input_tokens: usize,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// API 키와 기본값으로 생성
    pub fn with_api_key(api_key: String) -> Self {
        Self {
            api_key,
            url: OPENAI_EMBED_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: EMBEDDING_DIMENSION,
            max_input_tokens: MAX_INPUT_TOKENS,
            timeout_secs: EMBEDDING_TIMEOUT_SECS,
        }
    }
}

/// 답변 생성 설정
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    pub backend: LlmBackend,
    pub api_key: String,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl AnswerConfig {
    /// 백엔드 기본값으로 생성
    pub fn new(backend: LlmBackend, api_key: String) -> Self {
        let (url, model) = match backend {
            LlmBackend::OpenAi => (OPENAI_CHAT_URL, DEFAULT_OPENAI_CHAT_MODEL),
            LlmBackend::Anthropic => (ANTHROPIC_MESSAGES_URL, DEFAULT_ANTHROPIC_CHAT_MODEL),
        };
        Self {
            backend,
            api_key,
            url: url.to_string(),
            model: model.to_string(),
            timeout_secs: COMPLETION_TIMEOUT_SECS,
        }
    }
}

/// 전체 설정
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub embedding: EmbeddingConfig,
    pub answer: AnswerConfig,
    pub chunk: ChunkConfig,
    pub similarity: SimilarityMetric,
    pub top_k: usize,
    pub model_options: ModelOptions,
}

impl RagConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 조회 함수로 설정 로드 (테스트에서 환경변수 대신 사용)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_key = get("OPENAI_API_KEY");
        let anthropic_key = get("ANTHROPIC_API_KEY");

        let Some(openai_key) = openai_key else {
            bail!(
                "OPENAI_API_KEY not set (required for embeddings).\n\
                 Set: export OPENAI_API_KEY=your-api-key"
            );
        };

        let backend = match get("RAG_LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => LlmBackend::OpenAi,
        };

        let answer_key = match backend {
            LlmBackend::OpenAi => openai_key.clone(),
            LlmBackend::Anthropic => anthropic_key.context(
                "ANTHROPIC_API_KEY not set (required when RAG_LLM_PROVIDER=anthropic)",
            )?,
        };

        let mut embedding = EmbeddingConfig::with_api_key(openai_key);
        if let Some(model) = get("RAG_EMBEDDING_MODEL") {
            embedding.model = model;
        }
        embedding.dimension = parse_or(&get, "RAG_EMBEDDING_DIMENSION", embedding.dimension)?;

        let mut answer = AnswerConfig::new(backend, answer_key);
        if let Some(model) = get("RAG_CHAT_MODEL") {
            answer.model = model;
        }

        if let Some(secs) = get("RAG_HTTP_TIMEOUT_SECS") {
            let secs: u64 = parse_value("RAG_HTTP_TIMEOUT_SECS", &secs)?;
            embedding.timeout_secs = secs;
            answer.timeout_secs = secs;
        }

        let defaults = ChunkConfig::default();
        let chunk = ChunkConfig {
            max_tokens: parse_or(&get, "RAG_CHUNK_MAX_TOKENS", defaults.max_tokens)?,
            overlap_sentences: parse_or(&get, "RAG_CHUNK_OVERLAP", defaults.overlap_sentences)?,
        };

        let similarity = match get("RAG_SIMILARITY").as_deref().map(str::trim) {
            None | Some("dot") | Some("inner") => SimilarityMetric::InnerProduct,
            Some("cosine") => SimilarityMetric::Cosine,
            Some(other) => bail!("Unknown RAG_SIMILARITY '{}'. Use 'dot' or 'cosine'", other),
        };

        let option_defaults = ModelOptions::default();
        let model_options = ModelOptions {
            temperature: parse_or(&get, "RAG_TEMPERATURE", option_defaults.temperature)?,
            max_tokens: parse_or(&get, "RAG_MAX_OUTPUT_TOKENS", option_defaults.max_tokens)?,
        };

        Ok(Self {
            embedding,
            answer,
            chunk,
            similarity,
            top_k: parse_or(&get, "RAG_TOP_K", 3)?,
            model_options,
        })
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, value, e))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// OpenAI API 키 존재 여부
pub fn has_openai_api_key() -> bool {
    std::env::var("OPENAI_API_KEY").map(|k| !k.is_empty()).unwrap_or(false)
}

/// Anthropic API 키 존재 여부
pub fn has_anthropic_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").map(|k| !k.is_empty()).unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RagConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RagConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("OPENAI_API_KEY", "sk-1")]).unwrap();
        assert_eq!(config.answer.backend, LlmBackend::OpenAi);
        assert_eq!(config.answer.api_key, "sk-1");
        assert_eq!(config.answer.model, DEFAULT_OPENAI_CHAT_MODEL);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.embedding.timeout_secs, 30);
        assert_eq!(config.answer.timeout_secs, 60);
        assert_eq!(config.chunk.max_tokens, 500);
        assert_eq!(config.chunk.overlap_sentences, 1);
        assert_eq!(config.similarity, SimilarityMetric::InnerProduct);
        assert_eq!(config.top_k, 3);
    }

    #[test]
    fn test_missing_openai_key() {
        let err = load(&[("ANTHROPIC_API_KEY", "ant")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_anthropic_backend() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("ANTHROPIC_API_KEY", "ant-1"),
            ("RAG_LLM_PROVIDER", "Anthropic"),
        ])
        .unwrap();
        assert_eq!(config.answer.backend, LlmBackend::Anthropic);
        assert_eq!(config.answer.api_key, "ant-1");
        assert_eq!(config.answer.url, ANTHROPIC_MESSAGES_URL);
        assert_eq!(config.embedding.api_key, "sk-1");
    }

    #[test]
    fn test_anthropic_key_alone_keeps_openai_backend() {
        let config = load(&[("OPENAI_API_KEY", "sk-1"), ("ANTHROPIC_API_KEY", "ant-1")]).unwrap();
        assert_eq!(config.answer.backend, LlmBackend::OpenAi);
        assert_eq!(config.answer.api_key, "sk-1");
    }

    #[test]
    fn test_anthropic_backend_without_key() {
        let err = load(&[("OPENAI_API_KEY", "sk-1"), ("RAG_LLM_PROVIDER", "anthropic")])
            .unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("RAG_CHUNK_MAX_TOKENS", "120"),
            ("RAG_CHUNK_OVERLAP", "0"),
            ("RAG_TOP_K", "5"),
            ("RAG_SIMILARITY", "cosine"),
            ("RAG_HTTP_TIMEOUT_SECS", "5"),
            ("RAG_CHAT_MODEL", "gpt-test"),
        ])
        .unwrap();
        assert_eq!(config.chunk.max_tokens, 120);
        assert_eq!(config.chunk.overlap_sentences, 0);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.similarity, SimilarityMetric::Cosine);
        assert_eq!(config.embedding.timeout_secs, 5);
        assert_eq!(config.answer.timeout_secs, 5);
        assert_eq!(config.answer.model, "gpt-test");
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("OPENAI_API_KEY", "sk-1"), ("RAG_TOP_K", "many")]).unwrap_err();
        assert!(err.to_string().contains("RAG_TOP_K"));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("openai".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!("claude".parse::<LlmBackend>().unwrap(), LlmBackend::Anthropic);
        assert!("gemini".parse::<LlmBackend>().is_err());
        assert_eq!(LlmBackend::Anthropic.to_string(), "anthropic");
    }
}
