//! PDF 로더
//!
//! pdf-extract 크레이트로 텍스트를 추출하고 페이지마다 문서 하나를 만듭니다.

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::knowledge::Document;

use super::DocumentLoader;

/// PDF 로더 (페이지별 문서, `page`는 1부터)
pub struct PdfLoader {
    path: PathBuf,
}

impl PdfLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(&self) -> Result<Vec<Document>> {
        let pages = extract_text_from_pdf(&self.path)?;
        let total_pages = pages.len();
        let source = self.path.to_string_lossy().into_owned();

        Ok(pages
            .into_iter()
            .map(|(page, text)| {
                Document::new(text, source.clone())
                    .with_metadata("page", page)
                    .with_metadata("total_pages", total_pages)
            })
            .collect())
    }
}

/// PDF에서 텍스트 추출
///
/// (페이지 번호, 텍스트) 목록을 반환합니다. 페이지 번호는 1부터 시작합니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<Vec<(usize, String)>> {
    let bytes = std::fs::read(path).map_err(|e| IngestError::io(path, e))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| IngestError::file_parse(path, e.to_string()))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![(1, String::new())]);
    }

    Ok(split_pdf_pages(&text)
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .collect())
}

/// 폼피드(\x0c) 기준으로 페이지 분리, 구분이 없으면 전체가 한 페이지
fn split_pdf_pages(text: &str) -> Vec<String> {
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.is_empty() {
        vec![text.trim().to_string()]
    } else {
        pages
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_pdf_pages_with_formfeed() {
        let text = "Page 1 content\x0cPage 2 content\x0cPage 3 content";
        let pages = split_pdf_pages(text);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], "Page 1 content");
        assert_eq!(pages[1], "Page 2 content");
    }

    #[test]
    fn test_split_pdf_pages_no_separator() {
        let pages = split_pdf_pages("Just some text without page breaks");
        assert_eq!(pages, vec!["Just some text without page breaks"]);
    }

    #[test]
    fn test_split_skips_blank_pages() {
        let pages = split_pdf_pages("one\x0c  \x0ctwo");
        assert_eq!(pages, vec!["one", "two"]);
    }

    #[test]
    fn test_invalid_pdf_is_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").expect("write");

        let err = PdfLoader::new(&path).load().expect_err("invalid pdf");
        assert!(matches!(err, IngestError::FileParse { .. }));
    }
}
