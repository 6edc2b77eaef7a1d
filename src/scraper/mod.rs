//! 웹 페이지 로더 - URL 콘텐츠 추출
//!
//! 설정된 URL 목록을 순서대로 하나씩 가져와 문서로 만듭니다.
//! 네트워크 오류, HTTP 에러 상태, 잘못된 URL은 모두 `WebFetch` 에러이며
//! 수집 전체를 중단시킵니다.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::WebConfig;
use crate::error::{IngestError, Result};
use crate::knowledge::Document;

/// 본문 후보 셀렉터 (우선순위 순)
const CONTENT_SELECTORS: [&str; 6] = [
    "article",
    "main",
    "[role=main]",
    ".content",
    "#content",
    "body",
];

/// 본문으로 인정하는 최소 길이 (바이트)
const MIN_CONTENT_LEN: usize = 100;

/// 텍스트 추출에서 제외할 요소
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// 파싱된 페이지
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// 페이지 제목
    pub title: Option<String>,
    /// meta description
    pub description: Option<String>,
    /// `<html lang>`
    pub language: Option<String>,
    /// 본문 텍스트 (HTML 태그 제거됨)
    pub content: String,
}

impl ParsedPage {
    /// 문서로 변환 (`source` = URL)
    pub fn into_document(self, url: &str) -> Document {
        let mut doc = Document::new(self.content, url);
        if let Some(title) = self.title {
            doc = doc.with_metadata("title", title);
        }
        if let Some(description) = self.description {
            doc = doc.with_metadata("description", description);
        }
        if let Some(language) = self.language {
            doc = doc.with_metadata("language", language);
        }
        doc
    }
}

/// 웹 페이지 로더
pub struct WebPageLoader {
    client: reqwest::Client,
}

impl WebPageLoader {
    /// 설정으로 로더 생성
    pub fn new(config: &WebConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IngestError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// URL 목록을 순서대로 로드 (하나라도 실패하면 중단)
    pub async fn load(&self, urls: &[String]) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(urls.len());
        for url in urls {
            documents.push(self.fetch(url).await?);
        }
        tracing::info!("Loaded {} web pages", documents.len());
        Ok(documents)
    }

    /// URL 하나 가져오기
    pub async fn fetch(&self, url: &str) -> Result<Document> {
        let parsed = url::Url::parse(url).map_err(|e| IngestError::web_fetch(url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IngestError::web_fetch(
                url,
                format!("unsupported scheme: {}", parsed.scheme()),
            ));
        }

        tracing::info!("Fetching: {}", url);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IngestError::web_fetch(url, e))?;

        let html = response
            .text()
            .await
            .map_err(|e| IngestError::web_fetch(url, e))?;

        Ok(parse_html(&html).into_document(url))
    }
}

// ============================================================================
// HTML Parsing
// ============================================================================

/// HTML 문자열 파싱
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        language: extract_language(&document),
        content: extract_content(&document),
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 제목: `<title>`, 없으면 첫 `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].into_iter().find_map(|selector| {
        select_first(document, selector).and_then(|e| non_empty(&e.text().collect::<String>()))
    })
}

fn extract_description(document: &Html) -> Option<String> {
    select_first(document, r#"meta[name="description"]"#)
        .and_then(|e| e.value().attr("content"))
        .and_then(non_empty)
}

fn extract_language(document: &Html) -> Option<String> {
    select_first(document, "html")
        .and_then(|e| e.value().attr("lang"))
        .and_then(non_empty)
}

/// 본문 추출: 충분히 긴 첫 후보, 없으면 body 전체
fn extract_content(document: &Html) -> String {
    for selector in CONTENT_SELECTORS {
        if let Some(element) = select_first(document, selector) {
            let text = extract_text_from_element(&element);
            if text.len() > MIN_CONTENT_LEN {
                return text;
            }
        }
    }

    select_first(document, "body")
        .map(|e| extract_text_from_element(&e))
        .unwrap_or_default()
}

/// 요소에서 텍스트 추출 (스크립트/스타일 제외, 공백 정리)
fn extract_text_from_element(element: &ElementRef) -> String {
    let mut text = String::new();

    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|e| SKIPPED_ELEMENTS.contains(&e.name()))
                .unwrap_or(false)
        });
        if skipped {
            continue;
        }

        let trimmed = fragment.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }

    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();
    match WHITESPACE.get_or_init(|| Regex::new(r"\s+").ok()) {
        Some(re) => re.replace_all(text, " ").trim().to_string(),
        None => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loader_creation() {
        assert!(WebPageLoader::new(&WebConfig::default()).is_ok());
    }

    #[test]
    fn test_extract_title() {
        let html = r#"
            <html>
                <head><title>Test Page Title</title></head>
                <body><h1>Main Heading</h1></body>
            </html>
        "#;
        assert_eq!(parse_html(html).title, Some("Test Page Title".to_string()));
    }

    #[test]
    fn test_extract_title_h1_fallback() {
        let html = r#"
            <html>
                <head><title></title></head>
                <body><h1>H1 Heading</h1></body>
            </html>
        "#;
        assert_eq!(parse_html(html).title, Some("H1 Heading".to_string()));
    }

    #[test]
    fn test_extract_content_from_article() {
        let html = r#"
            <html>
                <body>
                    <nav>Navigation menu</nav>
                    <article>
                        This is the main article content.
                        It should be extracted as the primary content.
                        More text to ensure it's over 100 characters.
                    </article>
                    <footer>Footer content</footer>
                </body>
            </html>
        "#;
        let content = parse_html(html).content;
        assert!(content.contains("main article content"));
        assert!(!content.contains("Navigation menu"));
        assert!(!content.contains("  "));
    }

    #[test]
    fn test_short_candidate_falls_back_to_body() {
        let html = r#"
            <html><body>
                <main>short</main>
                <p>outside</p>
                <script>var tracking = 1;</script>
                <style>p { color: red; }</style>
            </body></html>
        "#;
        let content = parse_html(html).content;
        assert_eq!(content, "short outside");
    }

    #[test]
    fn test_metadata_fields() {
        let html = r#"
            <html lang="ja">
                <head>
                    <title>会社概要</title>
                    <meta name="description" content="株式会社EcoTeeの概要">
                </head>
                <body>本文</body>
            </html>
        "#;
        let doc = parse_html(html).into_document("https://example.com/about");
        assert_eq!(doc.source(), Some("https://example.com/about"));
        assert_eq!(doc.content, "本文");
        assert_eq!(doc.metadata.get("title"), Some(&json!("会社概要")));
        assert_eq!(doc.metadata.get("description"), Some(&json!("株式会社EcoTeeの概要")));
        assert_eq!(doc.metadata.get("language"), Some(&json!("ja")));
    }

    #[test]
    fn test_missing_metadata_is_omitted() {
        let doc = parse_html("<html><body>x</body></html>").into_document("https://a.test/");
        assert!(!doc.metadata.contains_key("title"));
        assert!(!doc.metadata.contains_key("language"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_web_fetch_error() {
        let loader = WebPageLoader::new(&WebConfig::default()).expect("loader");
        let err = loader
            .load(&["not a url".to_string()])
            .await
            .expect_err("invalid url");
        assert!(matches!(err, IngestError::WebFetch { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_url_aborts_load() {
        let config = WebConfig {
            timeout_secs: 2,
            ..Default::default()
        };
        let loader = WebPageLoader::new(&config).expect("loader");
        let err = loader
            .load(&["http://127.0.0.1:9/".to_string()])
            .await
            .expect_err("unreachable");
        match err {
            IngestError::WebFetch { url, .. } => assert_eq!(url, "http://127.0.0.1:9/"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_url_list_is_empty() {
        let loader = WebPageLoader::new(&WebConfig::default()).expect("loader");
        assert!(loader.load(&[]).await.expect("load").is_empty());
    }
}
