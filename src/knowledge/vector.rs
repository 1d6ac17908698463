//! Vector Store - 인메모리 벡터 저장소
//!
//! 프로세스 전체에서 하나의 인스턴스를 공유합니다.
//! 모든 접근(add / search / size)은 저장소 전체를 감싸는 하나의 Mutex 안에서
//! 수행되므로 검색이 추가 중인 레코드를 보는 일은 없습니다.
//!
//! 검색은 인덱스 없는 전수 비교(O(N·D))이며 항상 정확한 결과를 냅니다.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 기본 임베딩 차원 (text-embedding-3-small)
pub const EMBEDDING_DIMENSION: usize = 1536;

// ============================================================================
// Types
// ============================================================================

/// 저장된 청크 레코드 (생성 후 불변)
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// 삽입 순서 (0부터 단조 증가)
    pub sequence: u64,
    /// 청크 텍스트
    pub text: String,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub record: Arc<ChunkRecord>,
    /// 유사도 스코어 (높을수록 유사)
    pub score: f32,
}

/// 유사도 계산 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimilarityMetric {
    /// 내적 (정규화 없음, 벡터 크기가 스코어에 반영됨)
    #[default]
    InnerProduct,
    /// 코사인 유사도
    Cosine,
}

impl SimilarityMetric {
    /// 두 벡터의 스코어
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::InnerProduct => inner_product(a, b),
            Self::Cosine => cosine_similarity(a, b),
        }
    }
}

// ============================================================================
// VectorStore
// ============================================================================

/// 인메모리 벡터 저장소
///
/// 추가만 가능하며 삭제 API는 없습니다. 저장소가 버려질 때 함께 사라집니다.
/// 크기 제한이 없으므로 오래 실행되는 프로세스에서는 메모리가 계속 늘어납니다.
#[derive(Debug, Default)]
pub struct VectorStore {
    records: Mutex<Vec<Arc<ChunkRecord>>>,
    metric: SimilarityMetric,
}

impl VectorStore {
    /// 내적 기반 저장소 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 유사도 방식을 지정하여 생성
    pub fn with_metric(metric: SimilarityMetric) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            metric,
        }
    }

    /// 유사도 방식
    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// 레코드 목록 잠금
    ///
    /// 레코드는 push 한 번으로만 추가되므로 poison 상태에서도 목록은 일관됩니다.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<ChunkRecord>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 레코드 추가
    ///
    /// # Returns
    /// 부여된 sequence
    pub fn add(&self, text: impl Into<String>, embedding: Vec<f32>) -> u64 {
        let mut records = self.lock();
        let sequence = records.len() as u64;
        records.push(Arc::new(ChunkRecord {
            sequence,
            text: text.into(),
            embedding,
        }));
        sequence
    }

    /// 상위 k개 검색
    ///
    /// 스코어 내림차순으로 정렬하며, 동점이면 먼저 추가된 레코드가 앞에 옵니다.
    /// 저장소가 비었거나 `top_k`가 0이면 빈 결과를 반환합니다.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
        let records = self.lock();
        if records.is_empty() || top_k == 0 {
            return vec![];
        }

        let mut scored: Vec<SearchResult> = records
            .iter()
            .map(|record| {
                let score = self.metric.score(query_embedding, &record.embedding);
                SearchResult {
                    // 오버플로로 생긴 NaN은 최하위
                    score: if score.is_nan() { f32::NEG_INFINITY } else { score },
                    record: Arc::clone(record),
                }
            })
            .collect();
        drop(records);

        // 안정 정렬: 동점은 삽입 순서 유지
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        tracing::debug!(
            "Vector search returned {} results (top_k={})",
            scored.len(),
            top_k
        );

        scored
    }

    /// 레코드 수
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 내적 계산
///
/// 길이가 다르거나 비어 있으면 0.0을 반환합니다.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위이며, 영벡터가 포함되면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product = inner_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
