//! company-rag - 사내 문서 RAG 수집 파이프라인
//!
//! 로컬 폴더와 웹 페이지에서 문서를 모으고, 사원 명부 CSV는 부서별 문서로
//! 합치며, 레거시 코드 페이지 정규화와 줄 단위 청킹을 거쳐 벡터 색인을 만듭니다.

pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod knowledge;
pub mod logging;
pub mod normalize;
pub mod roster;
pub mod scraper;
pub mod session;

// Re-exports
pub use collector::{CollectionStats, CollectorConfig, FileCollector};
pub use config::{AppConfig, RosterConfig, SourceMode, WebConfig};
pub use embedding::{
    create_embedder, get_api_key, has_api_key, EmbeddingProvider, HashEmbedding, OpenAiEmbedding,
};
pub use error::{IngestError, Result};
pub use extractor::{DocumentLoader, FileLoader, LoaderRegistry};
pub use ingest::{IngestPipeline, IngestReport};
pub use knowledge::{
    ChunkConfig, Chunker, ChunkingPolicy, Document, InMemoryVectorIndex, SearchResult,
    VectorIndex,
};
pub use normalize::{NormalizeMode, Normalizer};
pub use roster::{load_grouped_by_department, RosterLoader};
pub use crate::scraper::WebPageLoader;
pub use session::SessionContext;
