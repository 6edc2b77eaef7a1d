//! Document - 검색 가능한 텍스트 단위
//!
//! 모든 로더가 만들어내는 공통 타입입니다.
//! `metadata`에는 항상 출처를 나타내는 `source` 키가 있습니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 출처 메타데이터 키
pub const SOURCE_KEY: &str = "source";

/// 문서 메타데이터
pub type Metadata = BTreeMap<String, Value>;

/// 텍스트 + 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 본문
    pub content: String,
    /// 메타데이터 (source 필수)
    pub metadata: Metadata,
}

impl Document {
    /// 본문과 출처로 생성
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// 메타데이터 추가 (빌더)
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 출처
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).and_then(Value::as_str)
    }

    /// 문자열 메타데이터 조회
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}
