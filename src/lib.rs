//! # Vectra - Relational vector store
//!
//! Stores embeddings next to text and metadata in a SQLite database.
//!
//! Vectra provides:
//! - Dense retrieval over embeddings through a `cosine_distance` SQL function
//! - Sparse (lexical) retrieval over a lexeme index maintained beside the data
//! - Hybrid retrieval fusing both result lists
//! - Exact-match metadata filtering and deletion by source document
//! - Blocking and async entry points backed by the same operations

pub mod node;
pub mod query;
pub mod storage;
pub mod store;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use node::{NodeRecord, NodeRelationship, NodeWithEmbedding, RelatedNodeInfo, TextNode};
pub use query::{ExactMatchFilter, FilterValue, MetadataFilters, QueryMode, QueryResult, VectorStoreQuery};
pub use query::text_search::TextSearchConfig;
pub use storage::{SqliteVectorStore, StoreParams, StoreStats};
pub use store::VectorStore;

/// Result type alias for Vectra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Vectra operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid metadata filter: {0}")]
    InvalidFilter(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query_str must be specified for a sparse vector query.")]
    MissingQueryString,

    #[error("query_embedding must be specified for a dense vector query.")]
    MissingQueryEmbedding,

    #[error("Sparse and hybrid queries require a store created with hybrid_search enabled")]
    HybridSearchDisabled,

    #[error("Unknown text search config: {0} (expected english or simple)")]
    InvalidTextSearchConfig(String),

    #[error("Unsupported query mode: {0}")]
    UnsupportedMode(String),

    #[error("Vector store is closed")]
    Closed,

    #[error("Background task failed: {0}")]
    Task(String),
}
