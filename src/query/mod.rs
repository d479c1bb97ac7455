//! Query layer - what a caller asks for and how results are shaped
//!
//! - `types`: query, modes, filters and result types
//! - `filters`: exact-match filters rendered as SQL predicates
//! - `text_search`: analyzer behind the lexeme index
//! - `fusion`: merging dense and sparse result lists

pub mod types;
pub mod filters;
pub mod text_search;
pub mod fusion;

pub use types::{ExactMatchFilter, FilterValue, MetadataFilters, QueryMode, QueryResult, VectorStoreQuery};
pub use text_search::{TextAnalyzer, TextSearchConfig};
