//! Knowledge 모듈 - 문서 타입, 청킹 정책, 벡터 색인
//!
//! - Document: 로더가 만드는 공통 문서 단위
//! - Chunker: 줄 경계 윈도우 분할 (사원 명부는 제외)
//! - VectorIndex: 세션 단위 인메모리 벡터 색인

mod chunker;
mod document;
mod vector;

// Re-exports
pub use chunker::{
    Chunker, ChunkConfig, ChunkingPolicy, LineWindowChunker,
    default_chunker, line_chunker,
};
pub use document::{Document, Metadata, SOURCE_KEY};
pub use vector::{
    InMemoryVectorIndex, SearchResult, VectorEntry, VectorIndex,
    cosine_similarity,
};
