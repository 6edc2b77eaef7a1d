//! Vector Index - 벡터 색인 경계 및 인메모리 구현
//!
//! 세션 동안 한 번 구축되고 이후 읽기 전용으로 사용됩니다.
//! 벡터 DB 엔진은 외부 협력자로 취급하며, 여기서는 `add` / `search`
//! 계약만 지키는 인메모리 구현을 제공합니다.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{IngestError, Result};

use super::document::Document;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 원본 문서 (조각)
    pub document: Document,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 색인 공통 인터페이스
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// 문서 일괄 삽입, 삽입된 개수 반환
    async fn add(&mut self, documents: Vec<Document>) -> Result<usize>;

    /// 상위 k개 검색
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;

    /// 저장된 엔트리 수
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// InMemoryVectorIndex
// ============================================================================

/// 인메모리 벡터 색인 (전수 코사인 유사도 검색)
pub struct InMemoryVectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: Vec<VectorEntry>,
}

impl InMemoryVectorIndex {
    /// 빈 색인 생성
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// 문서 목록과 임베딩 핸들로 색인 구축
    pub async fn from_documents(
        documents: Vec<Document>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let mut index = Self::new(embedder);
        index.add(documents).await?;
        Ok(index)
    }

    /// 임베딩 프로바이더 이름
    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }
}

impl fmt::Debug for InMemoryVectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryVectorIndex")
            .field("embedder", &self.embedder.name())
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&mut self, documents: Vec<Document>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| IngestError::Embedding(format!("{e:#}")))?;

        if embeddings.len() != documents.len() {
            return Err(IngestError::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let count = documents.len();
        self.entries.extend(
            documents
                .into_iter()
                .zip(embeddings)
                .map(|(document, embedding)| VectorEntry {
                    document,
                    embedding,
                }),
        );

        tracing::info!(
            "Indexed {} documents with {} (total {})",
            count,
            self.embedder.name(),
            self.entries.len()
        );
        Ok(count)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| IngestError::Embedding(format!("{e:#}")))?;

        let mut results: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                document: entry.document.clone(),
                similarity: cosine_similarity(&query_embedding, &entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);

        Ok(results)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 길이가 다르거나 영벡터면 0.0을 반환합니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedding;

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashEmbedding::new(128))
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_matching_document_first() {
        let docs = vec![
            Document::new("営業 メンバー 一覧", "社員名簿.csv"),
            Document::new("expense report policy travel", "data/policy.txt"),
        ];
        let index = InMemoryVectorIndex::from_documents(docs, embedder())
            .await
            .expect("index");

        assert_eq!(index.len(), 2);

        let results = index.search("travel expense policy", 1).await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.source(), Some("data/policy.txt"));
    }

    #[tokio::test]
    async fn test_search_bounded_by_k() {
        let docs = (0..10)
            .map(|i| Document::new(format!("doc {i}"), format!("d{i}.txt")))
            .collect();
        let index = InMemoryVectorIndex::from_documents(docs, embedder())
            .await
            .expect("index");

        let results = index.search("doc", 3).await.expect("search");
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = InMemoryVectorIndex::new(embedder());
        assert!(index.is_empty());
        assert!(index.search("anything", 5).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn test_debug_shows_size_not_vectors() {
        let docs = vec![Document::new("alpha", "a.txt"), Document::new("beta", "b.txt")];
        let index = InMemoryVectorIndex::from_documents(docs, embedder())
            .await
            .expect("index");

        let debug = format!("{index:?}");
        assert!(debug.contains("hash-embedding"));
        assert!(debug.contains("entries: 2"));
    }
}
