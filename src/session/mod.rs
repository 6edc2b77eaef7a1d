//! 세션 컨텍스트
//!
//! 세션 하나가 색인 하나를 소유합니다. `initialize`는 최대 한 번만
//! 색인을 만들고, 초기화되지 않은 세션은 검색을 거부합니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{AppConfig, SourceMode};
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::{IngestError, Result};
use crate::ingest::{IngestPipeline, IngestReport};
use crate::knowledge::{Document, InMemoryVectorIndex, SearchResult, VectorIndex};

/// 세션 단위 애플리케이션 상태
pub struct SessionContext {
    session_id: String,
    started_at: DateTime<Utc>,
    config: AppConfig,
    mode: SourceMode,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<InMemoryVectorIndex>,
}

impl SessionContext {
    /// 새 세션 (모드는 설정의 `source`)
    pub fn new(config: AppConfig) -> Self {
        let mode = config.source;
        Self {
            session_id: Uuid::new_v4().simple().to_string(),
            started_at: Utc::now(),
            config,
            mode,
            embedder: None,
            index: None,
        }
    }

    /// 소스 모드 지정 (초기화 전에만 의미가 있음)
    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    /// 임베딩 프로바이더 지정 (없으면 설정으로 생성)
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    /// 색인 구축 (이미 있으면 아무것도 하지 않고 `None`)
    pub async fn initialize(&mut self) -> Result<Option<IngestReport>> {
        if self.index.is_some() {
            tracing::debug!(session_id = %self.session_id, "Session already initialized");
            return Ok(None);
        }

        tracing::info!(
            session_id = %self.session_id,
            mode = ?self.mode,
            "Initializing retriever"
        );

        let embedder = match &self.embedder {
            Some(embedder) => Arc::clone(embedder),
            None => {
                let embedder = create_embedder(&self.config.embedding)
                    .map_err(|e| IngestError::Embedding(format!("{e:#}")))?;
                self.embedder = Some(Arc::clone(&embedder));
                embedder
            }
        };

        let pipeline = IngestPipeline::new(self.config.clone());
        let (index, report) = pipeline.run(self.mode, embedder).await?;
        self.index = Some(index);
        Ok(Some(report))
    }

    /// 상위 k개 검색 (유사도 포함)
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let index = self.index.as_ref().ok_or(IngestError::NotInitialized)?;
        index.search(query, k).await
    }

    /// 설정된 `retriever_top_k`개 문서 검색
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>> {
        let results = self.search(query, self.config.retriever_top_k).await?;
        Ok(results.into_iter().map(|r| r.document).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
