//! 수집 파이프라인 에러 타입
//!
//! 초기화를 중단시키는 치명적 에러만 여기에 정의합니다.
//! 지원하지 않는 확장자 건너뛰기, 부서 컬럼 미검출은 에러가 아닙니다.

use std::path::PathBuf;

use thiserror::Error;

/// 수집 작업 Result 별칭
pub type Result<T> = std::result::Result<T, IngestError>;

/// 수집 파이프라인 에러
#[derive(Debug, Error)]
pub enum IngestError {
    /// 설정 오류
    #[error("Configuration error: {0}")]
    Config(String),

    /// 사원 명부 CSV를 어떤 인코딩으로도 읽지 못함
    #[error("Failed to read CSV {path:?} in any supported encoding (last error: {last_error})")]
    CsvRead { path: PathBuf, last_error: String },

    /// 웹 페이지 수집 실패 (필수 URL이므로 치명적)
    #[error("Failed to load web page {url}: {message}")]
    WebFetch { url: String, message: String },

    /// 파일 파싱 실패 (PDF, DOCX, CSV)
    #[error("Failed to parse file {path:?}: {message}")]
    FileParse { path: PathBuf, message: String },

    /// 임베딩 생성 실패
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// 세션이 초기화되지 않음
    #[error("Session is not initialized")]
    NotInitialized,

    /// IO 에러
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// 파일 파싱 에러 생성
    pub fn file_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FileParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 웹 수집 에러 생성
    pub fn web_fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::WebFetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// IO 에러 생성
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_read_error_message_carries_last_error() {
        let err = IngestError::CsvRead {
            path: PathBuf::from("社員名簿.csv"),
            last_error: "invalid byte sequence".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("社員名簿.csv"));
        assert!(msg.contains("invalid byte sequence"));
    }

    #[test]
    fn test_web_fetch_error_names_url() {
        let err = IngestError::web_fetch("https://example.com/", "timed out");
        assert_eq!(
            err.to_string(),
            "Failed to load web page https://example.com/: timed out"
        );
    }
}
