//! 수집 파이프라인
//!
//! 수집 → 정규화 → 분할 → 색인 순서로 한 번 실행됩니다.
//! 어느 단계든 실패하면 전체가 중단됩니다.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::collector::FileCollector;
use crate::config::{AppConfig, SourceMode};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::extractor::{FileLoader, LoaderRegistry};
use crate::knowledge::{line_chunker, ChunkingPolicy, Document, InMemoryVectorIndex};
use crate::normalize::Normalizer;
use crate::scraper::WebPageLoader;

/// 수집 결과 요약
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    /// 사용한 소스 모드
    pub mode: SourceMode,
    /// 로더가 만든 원본 문서 수
    pub raw_documents: usize,
    /// 그중 사원 명부 문서 수
    pub roster_documents: usize,
    /// 색인된 조각 수
    pub fragments_indexed: usize,
    /// 소요 시간
    pub elapsed: Duration,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source={:?} documents={} roster={} fragments={} elapsed={:.2}s",
            self.mode,
            self.raw_documents,
            self.roster_documents,
            self.fragments_indexed,
            self.elapsed.as_secs_f64()
        )
    }
}

/// 수집 파이프라인
pub struct IngestPipeline {
    config: AppConfig,
    registry: LoaderRegistry,
    normalizer: Normalizer,
}

impl IngestPipeline {
    pub fn new(config: AppConfig) -> Self {
        let normalizer = Normalizer::new(config.normalize);
        Self {
            config,
            registry: LoaderRegistry::builtin(),
            normalizer,
        }
    }

    /// 로더 레지스트리 교체
    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// 모드에 따라 로컬 / 웹 문서 수집 (로컬 먼저)
    pub async fn collect(&self, mode: SourceMode) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        if mode.includes_local() {
            let loader = FileLoader::new(self.registry.clone(), self.config.roster.clone());
            let collector = FileCollector::new(self.config.collector.clone());
            let (local, _stats) = collector.collect_documents(&self.config.data_dir, &loader)?;
            documents.extend(local);
        }

        if mode.includes_web() {
            let loader = WebPageLoader::new(&self.config.web)?;
            documents.extend(loader.load(&self.config.web.urls).await?);
        }

        Ok(documents)
    }

    /// 모든 문서의 본문과 메타데이터 값 정규화
    pub fn normalize(&self, documents: &mut [Document]) {
        if self.normalizer.is_lossy() {
            tracing::debug!("Applying legacy code page normalization");
        }
        for doc in documents.iter_mut() {
            self.normalizer.normalize_document(doc);
        }
    }

    /// 분할 정책
    pub fn chunking_policy(&self) -> ChunkingPolicy {
        ChunkingPolicy::new(
            line_chunker(self.config.chunking.clone()),
            self.config.roster.marker.clone(),
        )
    }

    /// 전체 파이프라인 실행
    pub async fn run(
        &self,
        mode: SourceMode,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<(InMemoryVectorIndex, IngestReport)> {
        let started = Instant::now();

        let mut documents = self.collect(mode).await?;
        self.normalize(&mut documents);

        let policy = self.chunking_policy();
        let raw_documents = documents.len();
        let roster_documents = documents.iter().filter(|d| policy.is_roster(d)).count();
        let fragments = policy.apply(documents);
        let fragments_indexed = fragments.len();

        let index = InMemoryVectorIndex::from_documents(fragments, embedder).await?;

        let report = IngestReport {
            mode,
            raw_documents,
            roster_documents,
            fragments_indexed,
            elapsed: started.elapsed(),
        };
        tracing::info!("Ingestion complete: {}", report);
        Ok((index, report))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbedding;
    use crate::error::IngestError;
    use crate::knowledge::VectorIndex;
    use crate::normalize::NormalizeMode;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir) -> AppConfig {
        AppConfig {
            data_dir: dir.path().to_path_buf(),
            normalize: NormalizeMode::Passthrough,
            ..Default::default()
        }
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashEmbedding::new(64))
    }

    fn write_fixture(dir: &TempDir) {
        let root = dir.path();
        std::fs::create_dir_all(root.join("規程")).expect("mkdir");
        std::fs::write(
            root.join("社員名簿.csv"),
            "氏名,部署\nA,営業\nB,営業\nC,人事\n",
        )
        .expect("write");
        let long_line = "あ".repeat(1200);
        std::fs::write(root.join("規程/就業規則.txt"), long_line).expect("write");
        std::fs::write(root.join("memo.md"), "短いメモ").expect("write");
        std::fs::write(root.join("logo.png"), [0u8; 4]).expect("write");
    }

    #[tokio::test]
    async fn test_local_ingest_report() {
        let dir = TempDir::new().expect("tempdir");
        write_fixture(&dir);

        let pipeline = IngestPipeline::new(config_for(&dir));
        let (index, report) = pipeline
            .run(SourceMode::Local, embedder())
            .await
            .expect("ingest");

        // 명부 2 + 규칙 1 + 메모 1
        assert_eq!(report.raw_documents, 4);
        assert_eq!(report.roster_documents, 2);
        // 1200자 한 줄 → 500/50 창 3개
        assert_eq!(report.fragments_indexed, 2 + 3 + 1);
        assert_eq!(index.len(), report.fragments_indexed);
    }

    #[tokio::test]
    async fn test_missing_data_dir_yields_empty_index() {
        let dir = TempDir::new().expect("tempdir");
        let config = AppConfig {
            data_dir: dir.path().join("missing"),
            ..Default::default()
        };

        let (index, report) = IngestPipeline::new(config)
            .run(SourceMode::Local, embedder())
            .await
            .expect("ingest");
        assert!(index.is_empty());
        assert_eq!(report.raw_documents, 0);
    }

    #[tokio::test]
    async fn test_web_mode_skips_local_files() {
        let dir = TempDir::new().expect("tempdir");
        write_fixture(&dir);

        let (_, report) = IngestPipeline::new(config_for(&dir))
            .run(SourceMode::Web, embedder())
            .await
            .expect("ingest");
        assert_eq!(report.raw_documents, 0);
    }

    #[tokio::test]
    async fn test_web_failure_aborts_both_mode() {
        let dir = TempDir::new().expect("tempdir");
        write_fixture(&dir);
        let mut config = config_for(&dir);
        config.web.urls = vec!["http://127.0.0.1:9/".to_string()];
        config.web.timeout_secs = 2;

        let err = IngestPipeline::new(config)
            .run(SourceMode::Both, embedder())
            .await
            .expect_err("web failure is fatal");
        assert!(matches!(err, IngestError::WebFetch { .. }));
    }

    #[tokio::test]
    async fn test_legacy_normalization_applies_before_indexing() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("note.txt"), "か\u{3099}😀").expect("write");
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            normalize: NormalizeMode::Legacy,
            ..Default::default()
        };

        let (index, _) = IngestPipeline::new(config)
            .run(SourceMode::Local, embedder())
            .await
            .expect("ingest");
        let hits = index.search("が", 1).await.expect("search");
        assert_eq!(hits[0].document.content, "が");
    }
}
