//! 파일 수집 모듈
//!
//! 로컬 폴더를 재귀적으로 순회하며 모든 일반 파일을 파일 로더에 넘깁니다.
//! 존재하지 않는 경로는 에러가 아니라 빈 결과입니다.
//! 심볼릭 링크는 따라가며, 링크 순환은 경고 후 건너뜁니다.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extractor::FileLoader;
use crate::knowledge::Document;

// ============================================================================
// Collector Config
// ============================================================================

/// 파일 수집기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// .gitignore 패턴 존중 여부
    pub respect_gitignore: bool,
    /// 숨김 파일 포함 여부
    pub include_hidden: bool,
    /// 최대 파일 크기 (바이트, 0이면 제한 없음)
    pub max_file_size: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: false,
            include_hidden: true,
            max_file_size: 0,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// 수집 통계
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    /// 발견한 파일 수
    pub files_seen: usize,
    /// 로더가 처리한 파일 수
    pub files_loaded: usize,
    /// 건너뛴 파일 수 (미지원 확장자, 크기 초과)
    pub files_skipped: usize,
    /// 생성된 문서 수
    pub documents: usize,
}

// ============================================================================
// File Collector
// ============================================================================

/// 재귀 디렉토리 수집기
pub struct FileCollector {
    config: CollectorConfig,
}

impl FileCollector {
    /// 새 수집기 생성
    pub fn new(config: CollectorConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 수집기 생성
    pub fn with_defaults() -> Self {
        Self::new(CollectorConfig::default())
    }

    /// 루트 아래 모든 일반 파일 경로 (지연 순회)
    ///
    /// 루트가 파일이면 그 파일 하나, 존재하지 않으면 아무것도 내지 않습니다.
    pub fn walk_files<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        let walker = root.exists().then(|| {
            WalkBuilder::new(root)
                .follow_links(true)
                .hidden(!self.config.include_hidden)
                .parents(self.config.respect_gitignore)
                .ignore(self.config.respect_gitignore)
                .git_ignore(self.config.respect_gitignore)
                .git_global(self.config.respect_gitignore)
                .git_exclude(self.config.respect_gitignore)
                .build()
        });

        walker
            .into_iter()
            .flatten()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    tracing::warn!("Failed to read entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
    }

    /// 루트 아래 모든 파일을 로드해 문서 목록 생성
    pub fn collect_documents(
        &self,
        root: &Path,
        loader: &FileLoader,
    ) -> Result<(Vec<Document>, CollectionStats)> {
        let mut documents = Vec::new();
        let mut stats = CollectionStats::default();

        if !root.exists() {
            tracing::info!("Local folder {:?} does not exist; nothing to collect", root);
            return Ok((documents, stats));
        }

        for path in self.walk_files(root) {
            stats.files_seen += 1;

            if self.exceeds_size_limit(&path) {
                stats.files_skipped += 1;
                continue;
            }

            if loader.load_into(&path, &mut documents)? {
                stats.files_loaded += 1;
            } else {
                stats.files_skipped += 1;
            }
        }

        stats.documents = documents.len();
        tracing::info!(
            "Collected {} documents from {} files under {:?} ({} skipped)",
            stats.documents,
            stats.files_loaded,
            root,
            stats.files_skipped
        );
        Ok((documents, stats))
    }

    /// 파일 크기 제한 초과 여부
    fn exceeds_size_limit(&self, path: &Path) -> bool {
        if self.config.max_file_size == 0 {
            return false;
        }
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > self.config.max_file_size => {
                tracing::debug!("Skipping large file: {:?} ({} bytes)", path, meta.len());
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
