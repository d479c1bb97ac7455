//! Hybrid result fusion
//!
//! Dense results come first, sparse results follow, and a node that already
//! appeared keeps its first position and score.

use super::types::QueryResult;
use std::collections::HashSet;

/// Concatenate `dense` and `sparse`, dropping repeated node ids
pub fn fuse(dense: QueryResult, sparse: QueryResult) -> QueryResult {
    let mut seen = HashSet::new();
    let mut fused = QueryResult::default();

    let rows = dense
        .nodes
        .into_iter()
        .zip(dense.similarities)
        .chain(sparse.nodes.into_iter().zip(sparse.similarities));

    for (node, score) in rows {
        if seen.insert(node.id.clone()) {
            fused.push(node, score);
        }
    }

    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::TextNode;

    fn result(rows: &[(&str, f32)]) -> QueryResult {
        let mut r = QueryResult::default();
        for (id, score) in rows {
            r.push(TextNode::new(*id, ""), *score);
        }
        r
    }

    #[test]
    fn test_dense_first_then_new_sparse_rows() {
        let fused = fuse(
            result(&[("aaa", 1.0), ("bbb", 0.77)]),
            result(&[("ccc", 0.5), ("ddd", 0.5)]),
        );
        assert_eq!(fused.ids, vec!["aaa", "bbb", "ccc", "ddd"]);
    }

    #[test]
    fn test_repeated_node_keeps_dense_position_and_score() {
        let fused = fuse(
            result(&[("bbb", 0.77), ("ddd", 0.2)]),
            result(&[("ddd", 0.5)]),
        );
        assert_eq!(fused.ids, vec!["bbb", "ddd"]);
        assert_eq!(fused.similarities, vec![0.77, 0.2]);
    }

    #[test]
    fn test_empty_dense_passes_sparse_through() {
        let fused = fuse(QueryResult::default(), result(&[("ccc", 0.5)]));
        assert_eq!(fused.ids, vec!["ccc"]);
    }
}
