//! 파일 로더 모듈
//!
//! 확장자 → 로더 생성자 레지스트리로 파일별 로더를 고릅니다.
//! - 텍스트 (.txt, .md): 인코딩 폴백으로 직접 읽기
//! - PDF: pdf-extract로 페이지별 추출
//! - DOCX: docx-rs로 문단 추출
//! - CSV: 행마다 문서 하나
//!
//! 사원 명부 파일은 확장자 디스패치를 거치지 않고 전용 로더로 갑니다.
//! 등록되지 않은 확장자는 조용히 건너뜁니다.

pub mod docx;
mod encoding;
pub mod pdf;
pub mod text;

use std::collections::HashMap;
use std::path::Path;

use crate::config::RosterConfig;
use crate::error::Result;
use crate::knowledge::Document;
use crate::roster::RosterLoader;

pub use docx::DocxLoader;
pub use encoding::{decode_text, TextEncoding};
pub use pdf::PdfLoader;
pub use text::{CsvLoader, TextLoader};

// ============================================================================
// Loader Trait
// ============================================================================

/// 파일 하나에서 문서를 만드는 로더
pub trait DocumentLoader {
    /// 문서 로드 (파일 핸들은 이 호출 안에서 닫힘)
    fn load(&self) -> Result<Vec<Document>>;
}

/// 로더 생성자
pub type LoaderConstructor = fn(&Path) -> Box<dyn DocumentLoader>;

// ============================================================================
// Registry
// ============================================================================

/// 확장자 → 로더 생성자 레지스트리
///
/// 키는 점을 포함한 확장자이며 대소문자를 구분합니다 (".pdf" ≠ ".PDF").
#[derive(Clone)]
pub struct LoaderRegistry {
    loaders: HashMap<&'static str, LoaderConstructor>,
}

impl LoaderRegistry {
    /// 빈 레지스트리
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// 내장 로더 등록
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(".txt", |p| Box::new(TextLoader::new(p)));
        registry.register(".md", |p| Box::new(TextLoader::new(p)));
        registry.register(".pdf", |p| Box::new(PdfLoader::new(p)));
        registry.register(".docx", |p| Box::new(DocxLoader::new(p)));
        registry.register(".csv", |p| Box::new(CsvLoader::new(p)));
        registry
    }

    /// 로더 등록 (같은 확장자는 덮어씀)
    pub fn register(&mut self, extension: &'static str, constructor: LoaderConstructor) {
        self.loaders.insert(extension, constructor);
    }

    /// 확장자로 생성자 조회
    pub fn get(&self, extension: &str) -> Option<LoaderConstructor> {
        self.loaders.get(extension).copied()
    }

    /// 등록된 확장자 (정렬)
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<_> = self.loaders.keys().copied().collect();
        exts.sort_unstable();
        exts
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// 점을 포함한 확장자 (".pdf")
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
}

// ============================================================================
// File Loader (dispatch)
// ============================================================================

/// 파일 경로 → 로더 디스패처
pub struct FileLoader {
    registry: LoaderRegistry,
    roster: RosterConfig,
}

impl FileLoader {
    pub fn new(registry: LoaderRegistry, roster: RosterConfig) -> Self {
        Self { registry, roster }
    }

    /// 사원 명부 파일 여부 (파일명 완전 일치)
    pub fn is_roster_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == self.roster.filename)
            .unwrap_or(false)
    }

    /// 파일을 로드해 `documents`에 추가
    ///
    /// 지원하지 않는 확장자면 아무것도 하지 않고 `false`를 반환합니다.
    pub fn load_into(&self, path: &Path, documents: &mut Vec<Document>) -> Result<bool> {
        let loader: Box<dyn DocumentLoader> = if self.is_roster_file(path) {
            Box::new(RosterLoader::new(path, self.roster.clone()))
        } else {
            let constructor = extension_of(path).and_then(|ext| self.registry.get(&ext));
            match constructor {
                Some(constructor) => constructor(path),
                None => {
                    tracing::debug!("Skipping unsupported file: {:?}", path);
                    return Ok(false);
                }
            }
        };

        let loaded = loader.load()?;
        tracing::debug!("Loaded {} documents from {:?}", loaded.len(), path);
        documents.extend(loaded);
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================
