//! 텍스트 / CSV 로더

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::knowledge::Document;

use super::encoding::decode_text;
use super::DocumentLoader;

/// 파일 전체 읽기 (핸들은 즉시 닫힘)
fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| IngestError::io(path, e))
}

fn source_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ============================================================================
// TextLoader
// ============================================================================

/// 평문 / 마크다운: 파일 하나 → 문서 하나
pub struct TextLoader {
    path: PathBuf,
}

impl TextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let bytes = read_bytes(&self.path)?;
        let (text, encoding) = decode_text(&bytes);
        if encoding.is_none() {
            tracing::warn!("Lossy UTF-8 decoding for {:?}", self.path);
        }
        Ok(vec![Document::new(text, source_of(&self.path))])
    }
}

// ============================================================================
// CsvLoader
// ============================================================================

/// 일반 CSV: 행 하나 → 문서 하나 (`컬럼: 값` 줄)
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLoader for CsvLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let bytes = read_bytes(&self.path)?;
        let (text, _) = decode_text(&bytes);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| IngestError::file_parse(&self.path, e.to_string()))?
            .clone();

        let source = source_of(&self.path);
        let mut documents = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| IngestError::file_parse(&self.path, e.to_string()))?;
            let content = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            documents.push(Document::new(content, source.clone()).with_metadata("row", row));
        }

        Ok(documents)
    }
}

// ============================================================================
// Tests
// ============================================================================
