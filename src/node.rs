//! Node types - the records a vector store holds
//!
//! A record is a `TextNode` paired with its embedding:
//! - `TextNode`: identifier, raw text, key/value metadata, relationships
//! - `NodeRelationship`: how a node relates to another node (source, parent, ...)
//! - `NodeWithEmbedding`: the unit passed to `add`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Free-form key/value metadata attached to a node
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Relationship kinds between nodes.
///
/// `Source` points at the document a node was derived from; its node id is
/// the node's reference document id, which is what `delete` matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRelationship {
    /// The document this node was derived from
    Source,
    /// The previous node in a document
    Previous,
    /// The next node in a document
    Next,
    /// Parent node in a hierarchy
    Parent,
    /// Child node in a hierarchy
    Child,
}

impl NodeRelationship {
    /// Get the string representation of the relationship
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRelationship::Source => "source",
            NodeRelationship::Previous => "previous",
            NodeRelationship::Next => "next",
            NodeRelationship::Parent => "parent",
            NodeRelationship::Child => "child",
        }
    }
}

impl FromStr for NodeRelationship {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "source" | "ref_doc" | "document" => Ok(NodeRelationship::Source),
            "previous" | "prev" => Ok(NodeRelationship::Previous),
            "next" => Ok(NodeRelationship::Next),
            "parent" => Ok(NodeRelationship::Parent),
            "child" => Ok(NodeRelationship::Child),
            _ => Err(Error::InvalidFilter(format!("Unknown node relationship: {}", s))),
        }
    }
}

impl std::fmt::Display for NodeRelationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The far end of a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedNodeInfo {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl RelatedNodeInfo {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            metadata: Metadata::new(),
        }
    }
}

/// A unit of text stored in the vector store.
///
/// The `id` is the node's identity: adding a node with an id that already
/// exists replaces the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    /// Unique identifier for this node
    pub id: String,
    /// Raw text, indexed for lexical search in hybrid stores
    pub text: String,
    /// Metadata matched by exact-match filters
    #[serde(default)]
    pub metadata: Metadata,
    /// Relationships to other nodes
    #[serde(default)]
    pub relationships: BTreeMap<NodeRelationship, RelatedNodeInfo>,
}

impl TextNode {
    /// Create a node with no metadata and no relationships
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Set a relationship
    pub fn with_relationship(mut self, relationship: NodeRelationship, info: RelatedNodeInfo) -> Self {
        self.relationships.insert(relationship, info);
        self
    }

    /// Point the source relationship at `doc_id`
    pub fn with_source(self, doc_id: impl Into<String>) -> Self {
        self.with_relationship(NodeRelationship::Source, RelatedNodeInfo::new(doc_id))
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Id of the document this node came from, if it has a source relationship
    pub fn ref_doc_id(&self) -> Option<&str> {
        self.relationships
            .get(&NodeRelationship::Source)
            .map(|info| info.node_id.as_str())
    }
}

/// A node together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWithEmbedding {
    pub node: TextNode,
    pub embedding: Vec<f32>,
}

impl NodeWithEmbedding {
    pub fn new(node: TextNode, embedding: Vec<f32>) -> Self {
        Self { node, embedding }
    }

    pub fn id(&self) -> &str {
        &self.node.id
    }
}

/// Flat, line-oriented form of a record used for bulk import.
///
/// `ref_doc_id` defaults to the record's own id, making the record its own
/// source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub ref_doc_id: Option<String>,
}

impl From<NodeRecord> for NodeWithEmbedding {
    fn from(record: NodeRecord) -> Self {
        let source = record.ref_doc_id.unwrap_or_else(|| record.id.clone());
        let mut node = TextNode::new(record.id, record.text).with_source(source);
        node.metadata = record.metadata;
        NodeWithEmbedding::new(node, record.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_doc_id_follows_source() {
        let node = TextNode::new("aaa", "lorem ipsum").with_source("aaa");
        assert_eq!(node.ref_doc_id(), Some("aaa"));

        let orphan = TextNode::new("bbb", "dolor sit amet")
            .with_relationship(NodeRelationship::Parent, RelatedNodeInfo::new("root"));
        assert_eq!(orphan.ref_doc_id(), None);
    }

    #[test]
    fn test_relationship_parse() {
        assert_eq!("SOURCE".parse::<NodeRelationship>().unwrap(), NodeRelationship::Source);
        assert_eq!("prev".parse::<NodeRelationship>().unwrap(), NodeRelationship::Previous);
        assert!("sibling".parse::<NodeRelationship>().is_err());
    }

    #[test]
    fn test_relationships_serialize_by_name() {
        let node = TextNode::new("ccc", "the fox").with_source("doc-1");
        let json = serde_json::to_value(&node.relationships).unwrap();
        assert_eq!(json["source"]["node_id"], "doc-1");

        let back: BTreeMap<NodeRelationship, RelatedNodeInfo> = serde_json::from_value(json).unwrap();
        assert_eq!(back, node.relationships);
    }

    #[test]
    fn test_record_defaults_to_self_source() {
        let record: NodeRecord = serde_json::from_str(
            r#"{"id": "bbb", "text": "dolor sit amet", "embedding": [0.1, 1.0], "metadata": {"test_key": "test_value"}}"#,
        )
        .unwrap();
        let item = NodeWithEmbedding::from(record);

        assert_eq!(item.id(), "bbb");
        assert_eq!(item.node.ref_doc_id(), Some("bbb"));
        assert_eq!(item.node.metadata["test_key"], "test_value");
        assert_eq!(item.embedding, vec![0.1, 1.0]);
    }
}
