//! Vector store interface
//!
//! Defines the operations every store backend implements. Backends write the
//! blocking methods; the async variants are provided on top of them and run
//! on tokio's blocking pool, so both entry points share one implementation.

use crate::node::NodeWithEmbedding;
use crate::query::{QueryResult, VectorStoreQuery};
use crate::{Error, Result};
use async_trait::async_trait;

/// Trait for vector store backends
///
/// A store handle is cheap to clone; clones share the same connection.
#[async_trait]
pub trait VectorStore: Clone + Send + Sync + 'static {
    /// Insert or replace nodes, returning their ids in input order
    fn add(&self, nodes: &[NodeWithEmbedding]) -> Result<Vec<String>>;

    /// Run a dense, sparse or hybrid query
    fn query(&self, query: &VectorStoreQuery) -> Result<QueryResult>;

    /// Delete every node whose source document is `ref_doc_id`
    fn delete(&self, ref_doc_id: &str) -> Result<()>;

    /// Release the underlying connection
    fn close_blocking(&self) -> Result<()>;

    async fn async_add(&self, nodes: &[NodeWithEmbedding]) -> Result<Vec<String>> {
        let store = self.clone();
        let nodes = nodes.to_vec();
        run_blocking(move || store.add(&nodes)).await
    }

    async fn aquery(&self, query: &VectorStoreQuery) -> Result<QueryResult> {
        let store = self.clone();
        let query = query.clone();
        run_blocking(move || store.query(&query)).await
    }

    async fn adelete(&self, ref_doc_id: &str) -> Result<()> {
        let store = self.clone();
        let ref_doc_id = ref_doc_id.to_string();
        run_blocking(move || store.delete(&ref_doc_id)).await
    }

    async fn close(&self) -> Result<()> {
        let store = self.clone();
        run_blocking(move || store.close_blocking()).await
    }
}

/// Run a blocking store operation on the blocking thread pool
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}
