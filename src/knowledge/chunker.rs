//! Text Chunking Module
//!
//! 줄바꿈 경계로 텍스트를 나누고, 고정 크기 윈도우 + 오버랩으로 병합합니다.
//! 사원 명부 문서는 부서 단위 묶음이 깨지지 않도록 분할하지 않습니다.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

use super::document::Document;

/// 줄 구분자
const SEPARATOR: char = '\n';

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 청킹 설정 (단위: 유니코드 문자 수)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// 최대 청크 크기
    pub chunk_size: usize,
    /// 오버랩 크기
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkConfig {
    /// 설정 검증 (overlap < size)
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::Config("chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// LineWindowChunker
// ============================================================================

/// 줄 단위 윈도우 청커
///
/// - 줄을 `\n`으로 이어 붙여 `chunk_size` 이하 윈도우를 만든다
/// - 다음 윈도우는 직전 윈도우 끝의 `chunk_overlap` 이하 분량을 이어받는다
/// - `chunk_size`보다 긴 한 줄은 문자 단위 윈도우로 자른다
pub struct LineWindowChunker {
    config: ChunkConfig,
}

impl LineWindowChunker {
    /// 설정으로 생성
    ///
    /// 검증을 통과하지 못한 설정은 `chunk_size >= 1`, `chunk_overlap < chunk_size`로 보정합니다.
    pub fn new(config: ChunkConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("{}; clamping chunk config", e);
        }
        let chunk_size = config.chunk_size.max(1);
        let chunk_overlap = config.chunk_overlap.min(chunk_size - 1);
        Self {
            config: ChunkConfig {
                chunk_size,
                chunk_overlap,
            },
        }
    }

    /// 기본 설정으로 생성
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// 텍스트를 줄 조각으로 분리 (긴 줄은 미리 자름)
    fn split_pieces(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();

        for line in text.split(SEPARATOR) {
            if line.is_empty() {
                continue;
            }
            if char_len(line) > self.config.chunk_size {
                pieces.extend(self.hard_windows(line));
            } else {
                pieces.push(line.to_string());
            }
        }

        pieces
    }

    /// 긴 줄을 chunk_size 윈도우로 자른다 (step = size - overlap)
    fn hard_windows(&self, line: &str) -> Vec<String> {
        let chars: Vec<char> = line.chars().collect();
        let size = self.config.chunk_size;
        let step = size.saturating_sub(self.config.chunk_overlap).max(1);

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        windows
    }

    /// 조각을 윈도우로 병합
    fn merge_pieces(&self, pieces: Vec<String>) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = 1;

        let mut chunks = Vec::new();
        let mut current: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(&piece);
            let sep = if current.is_empty() { 0 } else { sep_len };

            if total + len + sep > size && !current.is_empty() {
                push_joined(&mut chunks, &current);

                // 오버랩 분량만 남기고 앞에서부터 제거
                while total > overlap
                    || (total > 0 && total + len + if current.is_empty() { 0 } else { sep_len } > size)
                {
                    let Some((_, front_len)) = current.pop_front() else {
                        break;
                    };
                    total -= front_len + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if current.is_empty() { 0 } else { sep_len };
            current.push_back((piece, len));
        }

        push_joined(&mut chunks, &current);
        chunks
    }
}

impl Chunker for LineWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        // 이미 짧은 문서는 원본 그대로
        if char_len(text) <= self.config.chunk_size {
            return vec![text.to_string()];
        }

        let pieces = self.split_pieces(text);
        self.merge_pieces(pieces)
    }

    fn name(&self) -> &'static str {
        "LineWindowChunker"
    }
}

// ============================================================================
// Chunking Policy
// ============================================================================

/// 문서 컬렉션 분할 정책
///
/// `source`에 명부 마커가 포함된 문서는 그대로 통과시키고,
/// 나머지는 청커로 분할합니다. 조각은 부모 메타데이터를 그대로 물려받습니다.
pub struct ChunkingPolicy {
    chunker: Box<dyn Chunker>,
    roster_marker: String,
}

impl ChunkingPolicy {
    pub fn new(chunker: Box<dyn Chunker>, roster_marker: impl Into<String>) -> Self {
        Self {
            chunker,
            roster_marker: roster_marker.into(),
        }
    }

    /// 명부 문서 여부
    pub fn is_roster(&self, doc: &Document) -> bool {
        doc.source()
            .map(|source| source.contains(&self.roster_marker))
            .unwrap_or(false)
    }

    /// 컬렉션 전체 분할
    pub fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut result = Vec::with_capacity(documents.len());

        for doc in documents {
            if self.is_roster(&doc) {
                result.push(doc);
                continue;
            }

            let Document { content, metadata } = doc;
            result.extend(self.chunker.chunk(&content).into_iter().map(|chunk| Document {
                content: chunk,
                metadata: metadata.clone(),
            }));
        }

        tracing::debug!(
            "{} produced {} fragments",
            self.chunker.name(),
            result.len()
        );
        result
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 현재 윈도우를 이어 붙여 저장 (앞뒤 공백 제거, 빈 청크 제외)
fn push_joined(chunks: &mut Vec<String>, current: &VecDeque<(String, usize)>) {
    if current.is_empty() {
        return;
    }
    let joined = current
        .iter()
        .map(|(piece, _)| piece.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(LineWindowChunker::with_defaults())
}

/// 줄 윈도우 청커 생성 (설정 지정)
pub fn line_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(LineWindowChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunker(size: usize, overlap: usize) -> LineWindowChunker {
        LineWindowChunker::new(ChunkConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
    }

    #[test]
    fn test_chunker_empty() {
        let chunker = LineWindowChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("\n \n").is_empty());
    }

    #[test]
    fn test_short_text_is_single_identical_fragment() {
        let chunker = chunker(100, 10);
        let text = "first line\nsecond line\n";
        assert_eq!(chunker.chunk(text), vec![text.to_string()]);
    }

    #[test]
    fn test_lines_merge_with_overlap() {
        let chunker = chunker(10, 4);
        let chunks = chunker.chunk("aaaa\nbbbb\ncccc\ndddd");
        assert_eq!(chunks, vec!["aaaa\nbbbb", "bbbb\ncccc", "cccc\ndddd"]);
    }

    #[test]
    fn test_long_single_line_covered_within_size() {
        let chunker = chunker(1000, 200);
        let text: String = (0..5000)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();

        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 6);
        assert!(chunks.iter().all(|c| c.chars().count() <= 1000));

        // 모든 위치가 어떤 청크에 포함되는지 확인 (윈도우 시작 = i * 800)
        let chars: Vec<char> = text.chars().collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let start = i * 800;
            let expected: String = chars[start..(start + 1000).min(5000)].iter().collect();
            assert_eq!(chunk, &expected);
        }
        let last_start = (chunks.len() - 1) * 800;
        assert!(last_start + chunks.last().map(|c| c.chars().count()).unwrap_or(0) >= 5000);
    }

    #[test]
    fn test_multibyte_counts_characters() {
        let chunker = chunker(5, 1);
        let chunks = chunker.chunk("社員名簿一覧表です");
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
        assert_eq!(chunks[0], "社員名簿一");
    }

    #[test]
    fn test_invalid_config_is_clamped() {
        let zero = chunker(0, 0);
        assert_eq!(zero.chunk("abc"), vec!["a", "b", "c"]);

        let overlapping = chunker(4, 10);
        let chunks = overlapping.chunk("abcdefgh");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert!(chunks.last().is_some_and(|c| c.ends_with('h')));
    }

    #[test]
    fn test_config_validation() {
        assert!(ChunkConfig::default().validate().is_ok());
        assert!(ChunkConfig {
            chunk_size: 0,
            chunk_overlap: 0
        }
        .validate()
        .is_err());
        assert!(ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 100
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_policy_never_splits_roster() {
        let policy = ChunkingPolicy::new(line_chunker(ChunkConfig {
            chunk_size: 20,
            chunk_overlap: 5,
        }), "社員名簿");

        let long_body = "1. 氏名:山田\n".repeat(50);
        let roster = Document::new(long_body, "社員名簿.csv").with_metadata("merged", true);

        let result = policy.apply(vec![roster.clone()]);
        assert_eq!(result, vec![roster]);
    }

    #[test]
    fn test_policy_fragments_inherit_metadata() {
        let policy = ChunkingPolicy::new(line_chunker(ChunkConfig {
            chunk_size: 10,
            chunk_overlap: 2,
        }), "社員名簿");

        let doc = Document::new("aaaa\nbbbb\ncccc\ndddd", "data/manual.txt")
            .with_metadata("page", 3);
        let result = policy.apply(vec![doc.clone()]);

        assert!(result.len() > 1);
        for fragment in &result {
            assert_eq!(fragment.metadata, doc.metadata);
            assert_eq!(fragment.metadata.get("page"), Some(&json!(3)));
        }
    }

    #[test]
    fn test_policy_drops_blank_documents() {
        let policy = ChunkingPolicy::new(default_chunker(), "社員名簿");
        let result = policy.apply(vec![Document::new("  \n", "blank.txt")]);
        assert!(result.is_empty());
    }
}
