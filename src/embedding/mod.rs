//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 색인 구축과 질의 검색에 쓰이는 임베딩 프로바이더입니다.
//! - `OpenAiEmbedding`: OpenAI Embeddings API (기본)
//! - `HashEmbedding`: 네트워크 없이 동작하는 결정적 해시 임베딩
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_env("text-embedding-3-small")?;
//! let embedding = embedder.embed("社内規程").await?;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::{EmbeddingBackend, EmbeddingConfig};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// OpenAI 임베딩 API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/embeddings
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

/// 한 요청당 최대 입력 수
const MAX_BATCH_SIZE: usize = 100;
/// 호출 간 최소 딜레이
const MIN_DELAY_MS: u64 = 200;
/// 429 에러 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

/// OpenAI 임베딩 구현체
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    model: String,
    client: reqwest::Client,
    dimension: usize,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

/// 호출 간 최소 간격 보장
#[derive(Debug)]
struct RateLimiter {
    min_delay: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: None,
        }
    }

    async fn acquire(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                tracing::debug!("Min delay: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
}

impl OpenAiEmbedding {
    /// 새 인스턴스 생성
    pub fn new(api_key: String, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let dimension = dimension_for_model(&model);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model,
            client,
            dimension,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(Duration::from_millis(
                MIN_DELAY_MS,
            )))),
        })
    }

    /// 환경변수 `OPENAI_API_KEY`로 생성
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key, model)
    }

    /// 한 번의 API 호출로 여러 텍스트 임베딩 (429 재시도 포함)
    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=MAX_RETRIES {
            {
                let mut limiter = self.rate_limiter.lock().await;
                limiter.acquire().await;
            }

            let response = match self
                .client
                .post(OPENAI_EMBED_URL)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(anyhow::anyhow!("Failed to send embedding request: {}", e));
                    if attempt < MAX_RETRIES {
                        let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            "Request failed, retrying in {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read response body")?;

            if status.is_success() {
                let mut parsed: EmbedResponse =
                    serde_json::from_str(&body).context("Failed to parse embedding response")?;
                parsed.data.sort_by_key(|d| d.index);
                return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
            }

            if status.as_u16() == 429 {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                tracing::warn!(
                    "Rate limit hit (429), backing off {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    MAX_RETRIES
                );
                last_error = Some(anyhow::anyhow!("Rate limit exceeded (429)"));

                if attempt < MAX_RETRIES {
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            } else {
                if let Ok(error) = serde_json::from_str::<OpenAiError>(&body) {
                    anyhow::bail!(
                        "OpenAI API error ({}): {}",
                        error.error.kind,
                        error.error.message
                    );
                }
                anyhow::bail!("OpenAI API error ({}): {}", status, body);
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Embedding failed after {} retries", MAX_RETRIES)))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, batch) in texts.chunks(MAX_BATCH_SIZE).enumerate() {
            tracing::debug!(
                "Embedding batch {}/{}",
                i + 1,
                texts.len().div_ceil(MAX_BATCH_SIZE)
            );
            let vectors = self.request(batch).await?;
            if vectors.len() != batch.len() {
                anyhow::bail!(
                    "Embedding count mismatch: sent {}, received {}",
                    batch.len(),
                    vectors.len()
                );
            }
            results.extend(vectors);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// 모델별 기본 차원
fn dimension_for_model(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

// ============================================================================
// Hash Embedding
// ============================================================================

/// 결정적 해시 임베딩
///
/// 토큰(영숫자 연속)과 그 문자 bigram을 SHA-256으로 버킷에 매핑해 빈도를 센 뒤
/// L2 정규화합니다. 공백이 없는 일본어 텍스트도 bigram으로 겹침을 잡습니다.
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimension: usize,
}

impl HashEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, feature: &str) -> usize {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        (u64::from_le_bytes(bytes) % self.dimension as u64) as usize
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[self.bucket(token)] += 1.0;

            let chars: Vec<char> = token.chars().collect();
            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                vector[self.bucket(&bigram)] += 0.5;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in vector.iter_mut() {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hash-embedding"
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 환경변수 이름
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// API 키 로드 (`OPENAI_API_KEY`)
pub fn get_api_key() -> Result<String> {
    match non_empty_key(std::env::var(API_KEY_ENV)) {
        Some(key) => Ok(key),
        None => anyhow::bail!(
            "API key not found. Set OPENAI_API_KEY environment variable.\n\
             Get your API key at: https://platform.openai.com/api-keys"
        ),
    }
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    non_empty_key(std::env::var(API_KEY_ENV)).is_some()
}

/// 비어 있지 않은 키만 인정
fn non_empty_key(value: std::result::Result<String, std::env::VarError>) -> Option<String> {
    value.ok().filter(|key| !key.trim().is_empty())
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 따라 임베딩 프로바이더 생성
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingBackend::OpenAi => {
            let embedder = OpenAiEmbedding::from_env(config.model.clone())?;
            tracing::info!(
                "Using OpenAI embedding {} (dimension: {})",
                config.model,
                embedder.dimension()
            );
            Ok(Arc::new(embedder))
        }
        EmbeddingBackend::Hash => {
            tracing::info!(
                "Using offline hash embedding (dimension: {})",
                config.hash_dimension
            );
            Ok(Arc::new(HashEmbedding::new(config.hash_dimension)))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
