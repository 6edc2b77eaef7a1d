//! 사원 명부 CSV 로더
//!
//! 사원 한 명당 한 행인 CSV를 부서별로 묶어, 부서마다 문서 하나를 만듭니다.
//! "X 부서에 누가 있나" 같은 질의에서 부서 구성원이 한 검색 단위 안에
//! 모여 있도록 하기 위함이며, 그래서 명부 문서는 청킹 대상에서 제외됩니다.
//!
//! 처리 순서:
//! 1. 인코딩 폴백으로 CSV 읽기 (행이 하나 이상 나오는 첫 인코딩)
//! 2. 헤더에서 부서 컬럼 검출 (없으면 전원 미상 부서)
//! 3. 부서값(trim)으로 그룹화
//! 4. 그룹마다 문서 생성

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::RosterConfig;
use crate::error::{IngestError, Result};
use crate::extractor::{DocumentLoader, TextEncoding};
use crate::knowledge::Document;

/// 명부 문서 doctype
pub const ROSTER_DOCTYPE: &str = "employee_csv";

const HEADER_PREFIX: &str = "《部署》";
const COUNT_LABEL: &str = "人数";
const KEYWORD_LABEL: &str = "キーワード";
const DEPT_PLACEHOLDER: &str = "{dept}";

// ============================================================================
// Types
// ============================================================================

/// CSV 한 행 (컬럼명 → 값)
pub type RosterRow = HashMap<String, String>;

/// 파싱된 명부
#[derive(Debug, Clone)]
pub struct RosterTable {
    /// 헤더 (원래 순서)
    pub headers: Vec<String>,
    pub rows: Vec<RosterRow>,
    /// 실제로 사용된 인코딩
    pub encoding: TextEncoding,
}

/// 부서 그룹
#[derive(Debug, Clone)]
pub struct DepartmentGroup {
    pub department: String,
    /// 등장 순서대로의 구성원
    pub members: Vec<RosterRow>,
}

// ============================================================================
// Reading
// ============================================================================

/// 인코딩 폴백으로 명부 읽기
///
/// 행이 하나 이상 나오는 첫 인코딩을 사용합니다. 모두 실패하거나
/// 행이 없으면 마지막 에러를 담은 `CsvRead`를 반환합니다.
pub fn read_roster(path: &Path) -> Result<RosterTable> {
    let bytes = std::fs::read(path).map_err(|e| IngestError::CsvRead {
        path: path.to_path_buf(),
        last_error: e.to_string(),
    })?;

    let mut last_error = "no rows".to_string();

    for encoding in TextEncoding::FALLBACK_ORDER {
        match encoding
            .decode(&bytes)
            .and_then(|text| parse_rows(&text, encoding))
        {
            Ok(table) if !table.rows.is_empty() => {
                tracing::debug!(
                    "Read {} roster rows from {:?} as {}",
                    table.rows.len(),
                    path,
                    encoding
                );
                return Ok(table);
            }
            Ok(_) => {
                tracing::debug!("No roster rows in {:?} as {}", path, encoding);
            }
            Err(e) => {
                tracing::debug!("Failed to read {:?} as {}: {}", path, encoding, e);
                last_error = format!("{encoding}: {e}");
            }
        }
    }

    Err(IngestError::CsvRead {
        path: path.to_path_buf(),
        last_error,
    })
}

/// CSV 텍스트를 행으로 파싱
fn parse_rows(text: &str, encoding: TextEncoding) -> std::result::Result<RosterTable, String> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        let row: RosterRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(RosterTable {
        headers,
        rows,
        encoding,
    })
}

// ============================================================================
// Grouping
// ============================================================================

/// 헤더에서 부서 컬럼 검출 (별칭 우선순위 순, 완전 일치)
pub fn detect_department_column(headers: &[String], aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .find(|alias| headers.iter().any(|h| h == *alias))
        .cloned()
}

/// 부서별 그룹화 (첫 등장 순서 유지)
///
/// 부서 컬럼이 없거나 값이 비어 있으면 `unknown` 그룹으로 보냅니다.
pub fn group_by_department(
    rows: Vec<RosterRow>,
    department_column: Option<&str>,
    unknown: &str,
) -> Vec<DepartmentGroup> {
    let mut groups: Vec<DepartmentGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let department = department_column
            .and_then(|col| row.get(col))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .unwrap_or(unknown)
            .to_string();

        match positions.get(&department) {
            Some(&idx) => groups[idx].members.push(row),
            None => {
                positions.insert(department.clone(), groups.len());
                groups.push(DepartmentGroup {
                    department,
                    members: vec![row],
                });
            }
        }
    }

    groups
}

// ============================================================================
// Formatting
// ============================================================================

/// 표시 컬럼 순서
///
/// 우선 목록 중 존재하는 컬럼 → 나머지 컬럼(헤더 순서), 부서 컬럼은 제외.
pub fn display_columns(
    headers: &[String],
    preferred: &[String],
    department_column: Option<&str>,
) -> Vec<String> {
    let is_department = |col: &str| department_column == Some(col);

    let mut columns: Vec<String> = preferred
        .iter()
        .filter(|col| headers.contains(col) && !is_department(col))
        .cloned()
        .collect();

    for header in headers {
        if !columns.contains(header) && !is_department(header) {
            columns.push(header.clone());
        }
    }

    columns
}

/// 부서 그룹 하나를 문서로 변환
pub fn format_department_document(
    group: &DepartmentGroup,
    columns: &[String],
    config: &RosterConfig,
) -> Document {
    let dept = group.department.as_str();

    let mut header = format!("{HEADER_PREFIX}{dept}");
    if config.hr_synonyms.iter().any(|s| s == dept) {
        header.push_str(&config.hr_annotation);
    }

    let mut lines = Vec::with_capacity(group.members.len() + 3);
    lines.push(header);
    lines.push(format!("{COUNT_LABEL}: {}", group.members.len()));

    for (i, member) in group.members.iter().enumerate() {
        let parts: Vec<String> = columns
            .iter()
            .filter_map(|col| {
                let value = member.get(col)?.trim();
                (!value.is_empty()).then(|| format!("{col}:{value}"))
            })
            .collect();
        lines.push(format!("{}. {}", i + 1, parts.join(" | ")));
    }

    let keywords: Vec<String> = config
        .keywords
        .iter()
        .map(|k| k.replace(DEPT_PLACEHOLDER, dept))
        .collect();
    lines.push(format!("{KEYWORD_LABEL}: {}", keywords.join(", ")));

    Document::new(lines.join("\n"), config.filename.clone())
        .with_metadata("doctype", ROSTER_DOCTYPE)
        .with_metadata("department", dept)
        .with_metadata("merged", Value::Bool(true))
}

/// 명부 파일 → 부서별 문서
pub fn load_grouped_by_department(path: &Path, config: &RosterConfig) -> Result<Vec<Document>> {
    let table = read_roster(path)?;

    let department_column = detect_department_column(&table.headers, &config.department_aliases);
    if department_column.is_none() {
        tracing::debug!(
            "No department column in {:?}; grouping all rows under {}",
            path,
            config.unknown_department
        );
    }

    let columns = display_columns(
        &table.headers,
        &config.preferred_columns,
        department_column.as_deref(),
    );

    let row_count = table.rows.len();
    let groups = group_by_department(
        table.rows,
        department_column.as_deref(),
        &config.unknown_department,
    );

    let documents: Vec<Document> = groups
        .iter()
        .map(|group| format_department_document(group, &columns, config))
        .collect();

    tracing::info!(
        "Roster {:?}: {} rows -> {} department documents ({})",
        path,
        row_count,
        documents.len(),
        table.encoding
    );
    Ok(documents)
}

// ============================================================================
// Loader
// ============================================================================

/// 사원 명부 전용 로더
pub struct RosterLoader {
    path: PathBuf,
    config: RosterConfig,
}

impl RosterLoader {
    pub fn new(path: impl Into<PathBuf>, config: RosterConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }
}

impl DocumentLoader for RosterLoader {
    fn load(&self) -> Result<Vec<Document>> {
        load_grouped_by_department(&self.path, &self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::SHIFT_JIS;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join("社員名簿.csv");
        std::fs::write(&path, bytes).expect("write csv");
        path
    }

    fn load(bytes: &[u8]) -> Result<Vec<Document>> {
        let dir = TempDir::new().expect("tempdir");
        let path = write_csv(&dir, bytes);
        load_grouped_by_department(&path, &RosterConfig::default())
    }

    fn member_lines(doc: &Document) -> Vec<&str> {
        doc.content
            .lines()
            .filter(|line| {
                line.split_once(". ")
                    .map(|(n, _)| n.parse::<usize>().is_ok())
                    .unwrap_or(false)
            })
            .collect()
    }

    #[test]
    fn test_groups_example_roster() {
        let docs = load("氏名,部署\nA,営業\nB,営業\nC,人事\n".as_bytes()).expect("load");

        assert_eq!(docs.len(), 2);

        let sales = &docs[0];
        assert_eq!(sales.meta_str("department"), Some("営業"));
        assert_eq!(member_lines(sales), vec!["1. 氏名:A", "2. 氏名:B"]);

        let hr = &docs[1];
        assert_eq!(hr.meta_str("department"), Some("人事"));
        assert!(hr
            .content
            .starts_with("《部署》人事（人事部 / HR / Human Resources）\n"));
    }

    #[test]
    fn test_document_layout_and_metadata() {
        let docs = load("氏名,部署\nA,営業\n".as_bytes()).expect("load");
        let doc = &docs[0];

        assert_eq!(
            doc.content,
            "《部署》営業\n人数: 1\n1. 氏名:A\n\
             キーワード: 営業, 営業の社員一覧, 営業 メンバー, 従業員, 社員, 社内名簿"
        );
        assert_eq!(doc.source(), Some("社員名簿.csv"));
        assert_eq!(doc.meta_str("doctype"), Some("employee_csv"));
        assert_eq!(doc.metadata.get("merged"), Some(&json!(true)));
    }

    #[test]
    fn test_non_hr_header_has_no_annotation() {
        let docs = load("氏名,部署\nA,営業\n".as_bytes()).expect("load");
        assert!(docs[0].content.starts_with("《部署》営業\n"));
    }

    #[test]
    fn test_no_department_column_yields_single_unknown_group() {
        let docs = load("氏名,メール\nA,a@x\nB,b@x\nC,c@x\n".as_bytes()).expect("load");

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].meta_str("department"), Some("不明"));
        assert_eq!(member_lines(&docs[0]).len(), 3);
        assert!(docs[0].content.contains("人数: 3"));
    }

    #[test]
    fn test_counts_match_distinct_departments_and_rows() {
        let csv = "氏名,部門\n\
                   A,営業\n\
                   B, 営業 \n\
                   C,開発\n\
                   D,\n\
                   E,人事部\n\
                   F,開発\n";
        let docs = load(csv.as_bytes()).expect("load");

        // 営業 / 開発 / 不明 / 人事部
        assert_eq!(docs.len(), 4);
        let total: usize = docs.iter().map(|d| member_lines(d).len()).sum();
        assert_eq!(total, 6);

        let departments: Vec<&str> = docs.iter().filter_map(|d| d.meta_str("department")).collect();
        assert_eq!(departments, vec!["営業", "開発", "不明", "人事部"]);
    }

    #[test]
    fn test_column_order_and_empty_values() {
        let csv = "備考,部署,メール,氏名\n在宅, 営業,a@x,A\n,営業,,B\n";
        let docs = load(csv.as_bytes()).expect("load");

        assert_eq!(
            member_lines(&docs[0]),
            vec!["1. 氏名:A | メール:a@x | 備考:在宅", "2. 氏名:B"]
        );
        assert!(!docs[0].content.contains("部署:"));
    }

    #[test]
    fn test_department_alias_priority() {
        let headers: Vec<String> = ["dept", "部門", "氏名"].iter().map(|s| s.to_string()).collect();
        let aliases = RosterConfig::default().department_aliases;
        assert_eq!(
            detect_department_column(&headers, &aliases),
            Some("部門".to_string())
        );
        assert_eq!(detect_department_column(&headers[2..], &aliases), None);
    }

    #[test]
    fn test_reads_utf8_with_bom() {
        let bytes = [b"\xEF\xBB\xBF".as_slice(), "部署,氏名\n営業,A\n".as_bytes()].concat();
        let docs = load(&bytes).expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].meta_str("department"), Some("営業"));
    }

    #[test]
    fn test_reads_cp932() {
        let (bytes, _, unmappable) = SHIFT_JIS.encode("氏名,部署\n山田,総務\n佐藤,総務\n");
        assert!(!unmappable);

        let dir = TempDir::new().expect("tempdir");
        let path = write_csv(&dir, &bytes);
        let table = read_roster(&path).expect("read");
        assert_eq!(table.encoding, TextEncoding::Cp932);

        let docs = load(&bytes).expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].meta_str("department"), Some("総務"));
        assert_eq!(member_lines(&docs[0]), vec!["1. 氏名:山田", "2. 氏名:佐藤"]);
    }

    #[test]
    fn test_header_only_is_csv_read_error() {
        let err = load("氏名,部署\n".as_bytes()).expect_err("no rows");
        assert!(matches!(err, IngestError::CsvRead { .. }));
    }

    #[test]
    fn test_missing_file_is_csv_read_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = load_grouped_by_department(
            &dir.path().join("社員名簿.csv"),
            &RosterConfig::default(),
        )
        .expect_err("missing");
        assert!(matches!(err, IngestError::CsvRead { .. }));
    }

    #[test]
    fn test_loader_trait() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_csv(&dir, "氏名,部署\nA,営業\n".as_bytes());
        let loader = RosterLoader::new(path, RosterConfig::default());
        assert_eq!(loader.load().expect("load").len(), 1);
    }
}
