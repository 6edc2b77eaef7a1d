//! 텍스트 인코딩 폴백
//!
//! UTF-8(BOM) → UTF-8 → Windows-31J 순서로 디코딩을 시도합니다.

use std::fmt;

use encoding_rs::SHIFT_JIS;

/// UTF-8 BOM
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 지원 인코딩
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, 선두 BOM 제거
    Utf8Sig,
    /// UTF-8, BOM 유지
    Utf8,
    /// Windows-31J (cp932)
    Cp932,
}

impl TextEncoding {
    /// 시도 순서
    pub const FALLBACK_ORDER: [TextEncoding; 3] =
        [TextEncoding::Utf8Sig, TextEncoding::Utf8, TextEncoding::Cp932];

    /// 엄격 디코딩 (잘못된 바이트열이면 에러)
    pub fn decode(self, bytes: &[u8]) -> Result<String, String> {
        match self {
            TextEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body)
                    .map(str::to_string)
                    .map_err(|e| e.to_string())
            }
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| e.to_string()),
            TextEncoding::Cp932 => SHIFT_JIS
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned())
                .ok_or_else(|| "malformed Windows-31J byte sequence".to_string()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8Sig => "utf-8-sig",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Cp932 => "cp932",
        };
        f.write_str(name)
    }
}

/// 첫 번째로 성공한 인코딩으로 디코딩, 모두 실패하면 손실 UTF-8
pub fn decode_text(bytes: &[u8]) -> (String, Option<TextEncoding>) {
    for encoding in TextEncoding::FALLBACK_ORDER {
        if let Ok(text) = encoding.decode(bytes) {
            return (text, Some(encoding));
        }
    }
    (String::from_utf8_lossy(bytes).into_owned(), None)
}
