//! Query and result types

use crate::node::TextNode;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which retrieval path a query takes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Dense similarity search over embeddings
    #[default]
    Default,
    /// Lexical search over the lexeme index
    Sparse,
    /// Dense results followed by sparse results, de-duplicated
    Hybrid,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Default => "default",
            QueryMode::Sparse => "sparse",
            QueryMode::Hybrid => "hybrid",
        }
    }

    /// Whether this mode reads the lexeme index
    pub fn uses_text_search(&self) -> bool {
        matches!(self, QueryMode::Sparse | QueryMode::Hybrid)
    }
}

impl FromStr for QueryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" | "dense" => Ok(QueryMode::Default),
            "sparse" | "text" | "lexical" => Ok(QueryMode::Sparse),
            "hybrid" => Ok(QueryMode::Hybrid),
            _ => Err(Error::UnsupportedMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value side of an exact-match filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FilterValue {
    /// Interpret a command-line value: integers, floats and booleans are
    /// recognised, anything else is text.
    pub fn parse_loose(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            FilterValue::Integer(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            FilterValue::Float(f)
        } else if let Ok(b) = raw.parse::<bool>() {
            FilterValue::Bool(b)
        } else {
            FilterValue::Text(raw.to_string())
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// Metadata predicate: `metadata[key] == value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactMatchFilter {
    pub key: String,
    pub value: FilterValue,
}

impl ExactMatchFilter {
    pub fn new(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A conjunction of exact-match filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilters {
    pub filters: Vec<ExactMatchFilter>,
}

impl MetadataFilters {
    pub fn new(filters: Vec<ExactMatchFilter>) -> Self {
        Self { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// A retrieval request.
///
/// `similarity_top_k` bounds the dense list. `sparse_top_k` bounds the
/// sparse list and falls back to `similarity_top_k` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreQuery {
    pub query_embedding: Option<Vec<f32>>,
    pub query_str: Option<String>,
    pub similarity_top_k: usize,
    pub sparse_top_k: Option<usize>,
    pub filters: Option<MetadataFilters>,
    pub mode: QueryMode,
    /// Dense/sparse weighting. Not supported by the fusion; ignored with a warning.
    pub alpha: Option<f32>,
}

impl Default for VectorStoreQuery {
    fn default() -> Self {
        Self {
            query_embedding: None,
            query_str: None,
            similarity_top_k: 1,
            sparse_top_k: None,
            filters: None,
            mode: QueryMode::Default,
            alpha: None,
        }
    }
}

impl VectorStoreQuery {
    /// Dense query for the `top_k` nearest neighbours of `embedding`
    pub fn dense(embedding: Vec<f32>, top_k: usize) -> Self {
        Self {
            query_embedding: Some(embedding),
            similarity_top_k: top_k,
            ..Self::default()
        }
    }

    pub fn with_query_str(mut self, query_str: impl Into<String>) -> Self {
        self.query_str = Some(query_str.into());
        self
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sparse_top_k(mut self, sparse_top_k: usize) -> Self {
        self.sparse_top_k = Some(sparse_top_k);
        self
    }

    pub fn with_filters(mut self, filters: MetadataFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    /// Limit applied to the sparse list
    pub fn effective_sparse_top_k(&self) -> usize {
        self.sparse_top_k.unwrap_or(self.similarity_top_k)
    }

    /// The query string, or `MissingQueryString` when absent
    pub fn require_query_str(&self) -> Result<&str> {
        self.query_str.as_deref().ok_or(Error::MissingQueryString)
    }

    /// The query embedding, or `MissingQueryEmbedding` when absent
    pub fn require_embedding(&self) -> Result<&[f32]> {
        self.query_embedding.as_deref().ok_or(Error::MissingQueryEmbedding)
    }
}

/// Ordered query results.
///
/// `similarities[i]` and `ids[i]` describe `nodes[i]`. Dense rows carry
/// cosine similarity, sparse rows carry their lexical rank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub nodes: Vec<TextNode>,
    pub similarities: Vec<f32>,
    pub ids: Vec<String>,
}

impl QueryResult {
    pub fn push(&mut self, node: TextNode, similarity: f32) {
        self.ids.push(node.id.clone());
        self.similarities.push(similarity);
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_top_k_defaults_to_similarity_top_k() {
        let q = VectorStoreQuery::dense(vec![0.1, 1.0], 2).with_mode(QueryMode::Hybrid);
        assert_eq!(q.effective_sparse_top_k(), 2);

        let q = q.with_sparse_top_k(1);
        assert_eq!(q.effective_sparse_top_k(), 1);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("dense".parse::<QueryMode>().unwrap(), QueryMode::Default);
        assert_eq!("HYBRID".parse::<QueryMode>().unwrap(), QueryMode::Hybrid);
        assert!(matches!("mmr".parse::<QueryMode>(), Err(Error::UnsupportedMode(_))));
    }

    #[test]
    fn test_filter_value_parse_loose() {
        assert_eq!(FilterValue::parse_loose("42"), FilterValue::Integer(42));
        assert_eq!(FilterValue::parse_loose("0.5"), FilterValue::Float(0.5));
        assert_eq!(FilterValue::parse_loose("true"), FilterValue::Bool(true));
        assert_eq!(FilterValue::parse_loose("test_value"), FilterValue::Text("test_value".into()));
    }

    #[test]
    fn test_missing_query_str_message() {
        let q = VectorStoreQuery::dense(vec![1.0, 1.0], 10).with_mode(QueryMode::Hybrid);
        let err = q.require_query_str().unwrap_err();
        assert_eq!(err.to_string(), "query_str must be specified for a sparse vector query.");
    }
}
