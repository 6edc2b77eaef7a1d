//! 문자열 정규화 모듈
//!
//! 레거시 코드 페이지(Windows-31J) 환경에서는 확장 유니코드 문자가
//! 깨지므로, NFC 정규화 후 cp932로 왕복 변환하며 표현할 수 없는 문자를 버립니다.
//! 손실이 발생하는 것은 의도된 동작입니다. 그 외 환경에서는 아무것도 하지 않습니다.

use encoding_rs::SHIFT_JIS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::knowledge::Document;

/// 정규화 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// 플랫폼에 따라 결정 (Windows면 Legacy)
    #[default]
    Auto,
    /// 항상 레거시 코덱 왕복 변환
    Legacy,
    /// 변환 없음
    Passthrough,
}

impl NormalizeMode {
    /// Auto를 실제 모드로 해석
    pub fn resolve(self) -> Self {
        match self {
            NormalizeMode::Auto if cfg!(windows) => NormalizeMode::Legacy,
            NormalizeMode::Auto => NormalizeMode::Passthrough,
            other => other,
        }
    }
}

/// 문서 문자열 정규화기
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    legacy: bool,
}

impl Normalizer {
    pub fn new(mode: NormalizeMode) -> Self {
        Self {
            legacy: mode.resolve() == NormalizeMode::Legacy,
        }
    }

    /// 손실 변환을 수행하는지 여부
    pub fn is_lossy(&self) -> bool {
        self.legacy
    }

    /// 문자열 정규화
    pub fn normalize_str(&self, text: &str) -> String {
        if !self.legacy {
            return text.to_string();
        }
        round_trip_legacy(text)
    }

    /// 메타데이터 값 정규화 (문자열이 아니면 그대로)
    pub fn normalize_value(&self, value: Value) -> Value {
        match value {
            Value::String(s) if self.legacy => Value::String(round_trip_legacy(&s)),
            other => other,
        }
    }

    /// 문서 본문과 모든 메타데이터 값을 제자리에서 정규화
    pub fn normalize_document(&self, doc: &mut Document) {
        if !self.legacy {
            return;
        }

        doc.content = round_trip_legacy(&doc.content);
        for value in doc.metadata.values_mut() {
            let taken = std::mem::take(value);
            *value = self.normalize_value(taken);
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(NormalizeMode::Auto)
    }
}

/// Windows-31J 인코더가 WHATWG Shift_JIS와 다르게 처리하는 문자
///
/// `Some`은 인코딩 전에 치환할 문자, `None`은 버릴 문자입니다.
/// WHATWG 인코더는 U+00A5, U+203E를 ASCII `\`, `~`로 바꾸지만 cp932는 표현하지 못합니다.
const CP932_ENCODE_OVERRIDES: [(char, Option<char>); 8] = [
    ('\u{301C}', Some('\u{FF5E}')), // 〜 → ～
    ('\u{2016}', Some('\u{2225}')), // ‖ → ∥
    ('\u{2212}', Some('\u{FF0D}')), // − → －
    ('\u{00A2}', Some('\u{FFE0}')), // ¢ → ￠
    ('\u{00A3}', Some('\u{FFE1}')), // £ → ￡
    ('\u{00AC}', Some('\u{FFE2}')), // ¬ → ￢
    ('\u{00A5}', None),              // ¥
    ('\u{203E}', None),              // ‾
];

/// cp932 인코더 기준으로 문자 치환 (표현 불가면 `None`)
fn cp932_override(ch: char) -> Option<Option<char>> {
    CP932_ENCODE_OVERRIDES
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
}

/// NFC 정규화 후 cp932 인코딩 가능한 문자만 남긴다
fn round_trip_legacy(text: &str) -> String {
    let composed: String = text.nfc().collect();

    let mut bytes = Vec::with_capacity(composed.len());
    let mut buf = [0u8; 4];
    for ch in composed.chars() {
        let ch = match cp932_override(ch) {
            Some(Some(mapped)) => mapped,
            Some(None) => continue,
            None => ch,
        };
        let (encoded, _, unmappable) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            continue;
        }
        bytes.extend_from_slice(&encoded);
    }

    let (decoded, _) = SHIFT_JIS.decode_without_bom_handling(&bytes);
    decoded.into_owned()
}

// ============================================================================
// Tests
// ============================================================================
