//! Storage Layer - SQLite-backed persistence
//!
//! Each logical table `<name>` is stored as:
//! - data_<name>(node_id, text, metadata, relationships, ref_doc_id, embedding)
//! - data_<name>_lexemes(node_id, lexeme, frequency), only for hybrid stores
//!
//! Dense search runs through the `cosine_distance` SQL function that
//! `codec` registers on every connection.

pub mod schema;
pub mod codec;
pub mod sqlite;

pub use sqlite::{SqliteVectorStore, StoreParams, StoreStats, DEFAULT_EMBED_DIM};
