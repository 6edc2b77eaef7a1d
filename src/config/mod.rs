//! 설정 모듈
//!
//! 수집 파이프라인의 모든 상수(청크 크기, 검색 k, 로컬 폴더, 웹 URL 목록,
//! 사원 명부 관련 목록 등)를 한 곳에서 관리합니다.
//! TOML 파일에서 읽을 수 있으며, 생략된 항목은 기본값을 사용합니다.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::collector::CollectorConfig;
use crate::error::{IngestError, Result};
use crate::knowledge::ChunkConfig;
use crate::normalize::NormalizeMode;

/// 작업 디렉토리의 설정 파일 이름
pub const LOCAL_CONFIG_FILE: &str = "company-rag.toml";

// ============================================================================
// Source Mode
// ============================================================================

/// 데이터 소스 선택 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// 로컬 문서만
    #[default]
    Local,
    /// 웹 페이지만
    Web,
    /// 둘 다
    Both,
}

impl SourceMode {
    /// 로컬 폴더를 읽는지 여부
    pub fn includes_local(self) -> bool {
        matches!(self, SourceMode::Local | SourceMode::Both)
    }

    /// 웹 페이지를 읽는지 여부
    pub fn includes_web(self) -> bool {
        matches!(self, SourceMode::Web | SourceMode::Both)
    }
}

// ============================================================================
// Section Configs
// ============================================================================

/// 웹 페이지 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// 수집할 URL 목록 (순서 유지)
    pub urls: Vec<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            timeout_secs: 30,
            user_agent: format!("company-rag/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// 사원 명부 CSV 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// 명부 파일명 (이 이름의 파일은 확장자 디스패치를 거치지 않음)
    pub filename: String,
    /// 청킹 제외 판정용 source 부분 문자열
    pub marker: String,
    /// 부서 컬럼 후보 (우선순위 순)
    pub department_aliases: Vec<String>,
    /// 표시 컬럼 우선순위
    pub preferred_columns: Vec<String>,
    /// 인사부 동의어
    pub hr_synonyms: Vec<String>,
    /// 인사부 헤더에 붙는 주석
    pub hr_annotation: String,
    /// 부서 미상일 때의 그룹 키
    pub unknown_department: String,
    /// 검색 키워드 템플릿 (`{dept}`가 부서명으로 치환됨)
    pub keywords: Vec<String>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            filename: "社員名簿.csv".to_string(),
            marker: "社員名簿".to_string(),
            department_aliases: strings(&["部署", "部門", "部", "Department", "dept"]),
            preferred_columns: strings(&[
                "氏名", "社員ID", "役職", "役位", "メール", "内線", "拠点", "勤務地", "入社日",
            ]),
            hr_synonyms: strings(&["人事部", "人事", "HR", "Human Resources"]),
            hr_annotation: "（人事部 / HR / Human Resources）".to_string(),
            unknown_department: "不明".to_string(),
            keywords: strings(&[
                "{dept}",
                "{dept}の社員一覧",
                "{dept} メンバー",
                "従業員",
                "社員",
                "社内名簿",
            ]),
        }
    }
}

/// 임베딩 백엔드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI Embeddings API
    #[default]
    OpenAi,
    /// 오프라인 해시 임베딩
    Hash,
}

/// 임베딩 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    /// OpenAI 모델명
    pub model: String,
    /// 해시 임베딩 차원
    pub hash_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::OpenAi,
            model: "text-embedding-3-small".to_string(),
            hash_dimension: 256,
        }
    }
}

// ============================================================================
// App Config
// ============================================================================

/// 애플리케이션 전체 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 로컬 문서 최상위 폴더
    pub data_dir: PathBuf,
    /// 운영 로그 디렉토리
    pub log_dir: PathBuf,
    /// 데이터 소스 모드
    pub source: SourceMode,
    /// 검색 결과 개수
    pub retriever_top_k: usize,
    /// 문자열 정규화 모드
    pub normalize: NormalizeMode,
    pub chunking: ChunkConfig,
    pub collector: CollectorConfig,
    pub web: WebConfig,
    pub roster: RosterConfig,
    pub embedding: EmbeddingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_dir: PathBuf::from("./logs"),
            source: SourceMode::Local,
            retriever_top_k: 5,
            normalize: NormalizeMode::Auto,
            chunking: ChunkConfig::default(),
            collector: CollectorConfig::default(),
            web: WebConfig::default(),
            roster: RosterConfig::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl AppConfig {
    /// 설정 로드 (경로가 없으면 기본값)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 기본 위치의 설정 파일 탐색
    ///
    /// `./company-rag.toml`, 그다음 사용자 설정 디렉토리의
    /// `company-rag/config.toml` 순서로 찾습니다.
    pub fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("company-rag").join("config.toml"))
            .filter(|path| path.is_file())
    }

    /// TOML 파일에서 읽기
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
        Self::from_toml(&text)
    }

    /// TOML 문자열에서 읽기
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| IngestError::Config(e.to_string()))
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.retriever_top_k == 0 {
            return Err(IngestError::Config(
                "retriever_top_k must be positive".to_string(),
            ));
        }

        if self.roster.filename.is_empty() || self.roster.marker.is_empty() {
            return Err(IngestError::Config(
                "roster filename and marker must not be empty".to_string(),
            ));
        }

        for raw in &self.web.urls {
            url::Url::parse(raw)
                .map_err(|e| IngestError::Config(format!("invalid web url {raw}: {e}")))?;
        }

        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Tests
// ============================================================================
