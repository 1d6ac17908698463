//! OpenAI 임베딩 클라이언트
//!
//! ref: https://platform.openai.com/docs/api-reference/embeddings

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingService;
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;

/// OpenAI 임베딩 API 엔드포인트
pub const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

/// OpenAI 임베딩 구현체
///
/// 재시도는 하지 않습니다. 실패는 그대로 호출자에게 돌려줍니다.
#[derive(Debug)]
pub struct OpenAiEmbedding {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAiEmbedding {
    /// 설정으로 생성
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        if config.dimension == 0 {
            anyhow::bail!("Invalid embedding dimension: 0");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// 사용 중인 모델
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

/// API 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    /// text-embedding-3 계열만 지원
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// API 응답 (성공 또는 에러 필드)
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    async fn embed_text(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: text,
            dimensions: self
                .config
                .model
                .starts_with("text-embedding-3")
                .then_some(self.config.dimension),
        };

        let response = self
            .client
            .post(&self.config.url)
            .bearer_auth(self.config.api_key.trim())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed: Option<EmbedResponse> = serde_json::from_str(&body).ok();

        if let Some(error) = parsed.as_ref().and_then(|r| r.error.as_ref()) {
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message: error.message.clone(),
            });
        }

        if !status.is_success() {
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let embedding = parsed
            .and_then(|r| r.data.into_iter().next())
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Malformed(body.chars().take(200).collect()))?;

        if embedding.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn max_input_tokens(&self) -> usize {
        self.config.max_input_tokens
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, dimension: usize) -> OpenAiEmbedding {
        let config = EmbeddingConfig {
            url: format!("{}/v1/embeddings", server.uri()),
            dimension,
            ..EmbeddingConfig::with_api_key("test-key".to_string())
        };
        OpenAiEmbedding::new(config).unwrap()
    }

    #[test]
    fn test_invalid_dimension() {
        let config = EmbeddingConfig {
            dimension: 0,
            ..EmbeddingConfig::with_api_key("fake_key".to_string())
        };
        let err = OpenAiEmbedding::new(config).err().unwrap();
        assert!(err.to_string().contains("Invalid embedding dimension"));
    }

    #[tokio::test]
    async fn test_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(bearer_token("test-key"))
            .and(body_partial_json(json!({ "input": "hello", "dimensions": 3 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [0.1, 0.2, 0.3], "index": 0 }],
                "model": "text-embedding-3-small"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 3);
        let embedding = client.embed_text("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "Invalid input", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 3).embed_text("hello").await.unwrap_err();
        match err {
            EmbeddingError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid input");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_embed_server_error_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = client_for(&server, 3).embed_text("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_embed_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server, 3).embed_text("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_embed_dimension_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [0.1, 0.2] }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, 3).embed_text("hello").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
