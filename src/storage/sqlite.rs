//! SQLite vector store implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::codec::{self, COSINE_DISTANCE_FN};
use super::schema::{self, TableNames};
use crate::node::{NodeWithEmbedding, TextNode};
use crate::query::text_search::{TextAnalyzer, TextSearchConfig};
use crate::query::{filters, fusion, MetadataFilters, QueryMode, QueryResult, VectorStoreQuery};
use crate::store::VectorStore;
use crate::{Error, Result};

/// Embedding dimensionality used when none is given
pub const DEFAULT_EMBED_DIM: usize = 1536;

/// Database path that opens a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Lexical rank of a matching row: saturating term frequency summed over
/// the matched query lexemes. Independent of document length.
const LEXICAL_RANK: &str = "SUM(1.0 - 1.0 / (1.0 + l.frequency))";

/// Parameters a store is constructed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreParams {
    /// Database file, or `:memory:`
    pub database: PathBuf,
    /// Logical table name, stored as `data_<table_name>`
    pub table_name: String,
    pub embed_dim: usize,
    /// Maintain the lexeme index needed by sparse and hybrid queries
    pub hybrid_search: bool,
    pub text_search_config: TextSearchConfig,
}

impl StoreParams {
    pub fn new(database: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table_name: table_name.into(),
            embed_dim: DEFAULT_EMBED_DIM,
            hybrid_search: false,
            text_search_config: TextSearchConfig::default(),
        }
    }

    pub fn in_memory(table_name: impl Into<String>) -> Self {
        Self::new(IN_MEMORY, table_name)
    }

    pub fn with_embed_dim(mut self, embed_dim: usize) -> Self {
        self.embed_dim = embed_dim;
        self
    }

    pub fn with_hybrid_search(mut self, hybrid_search: bool) -> Self {
        self.hybrid_search = hybrid_search;
        self
    }

    pub fn with_text_search_config(mut self, config: TextSearchConfig) -> Self {
        self.text_search_config = config;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database.as_os_str() == IN_MEMORY
    }
}

/// SQLite-backed vector store.
///
/// Clones share one connection. After `close` every operation fails with
/// `Error::Closed`.
#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    conn: Mutex<Option<Connection>>,
    names: TableNames,
    params: StoreParams,
    analyzer: TextAnalyzer,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the database and table described by `params`.
    ///
    /// A table that already has a lexeme index stays hybrid whatever
    /// `hybrid_search` says. Creating the index on a populated table fills it
    /// from the stored text.
    pub fn from_params(mut params: StoreParams) -> Result<Self> {
        let names = TableNames::new(&params.table_name)?;

        let mut conn = if params.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            ensure_parent_dir(&params.database)?;
            Connection::open(&params.database)?
        };
        codec::register_functions(&conn)?;

        let indexed = table_exists(&conn, &names.lexemes)?;
        if indexed && !params.hybrid_search {
            tracing::info!("{} has a lexeme index, opening with hybrid search", names.data);
            params.hybrid_search = true;
        }

        for stmt in schema::all_schema_statements(&names, params.hybrid_search) {
            conn.execute(&stmt, [])?;
        }

        let analyzer = TextAnalyzer::new(params.text_search_config);
        if params.hybrid_search && !indexed {
            let rows = backfill_lexemes(&mut conn, &names, &analyzer)?;
            if rows > 0 {
                tracing::info!("Indexed lexemes of {} existing rows in {}", rows, names.data);
            }
        }

        tracing::info!(
            "Opened vector table {} in {:?} (dim {}, hybrid: {})",
            names.data,
            params.database,
            params.embed_dim,
            params.hybrid_search
        );

        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(Some(conn)),
                names,
                params,
                analyzer,
            }),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(table_name: &str, embed_dim: usize, hybrid_search: bool) -> Result<Self> {
        Self::from_params(
            StoreParams::in_memory(table_name)
                .with_embed_dim(embed_dim)
                .with_hybrid_search(hybrid_search),
        )
    }

    pub fn params(&self) -> &StoreParams {
        &self.inner.params
    }

    /// Physical name of the data table
    pub fn data_table(&self) -> &str {
        &self.inner.names.data
    }

    pub fn embed_dim(&self) -> usize {
        self.inner.params.embed_dim
    }

    pub fn hybrid_search(&self) -> bool {
        self.inner.params.hybrid_search
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Connection>> {
        self.inner.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let conn = guard.as_mut().ok_or(Error::Closed)?;
        f(conn)
    }

    fn check_dim(&self, vector: &[f32]) -> Result<()> {
        let expected = self.embed_dim();
        if vector.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn require_hybrid(&self) -> Result<()> {
        if self.hybrid_search() {
            Ok(())
        } else {
            Err(Error::HybridSearchDisabled)
        }
    }

    // ========== Write Operations ==========

    fn insert_nodes(&self, nodes: &[NodeWithEmbedding]) -> Result<Vec<String>> {
        for node in nodes {
            self.check_dim(&node.embedding)?;
        }

        let names = &self.inner.names;
        let hybrid = self.hybrid_search();
        let upsert = format!(
            r#"
            INSERT INTO {} (node_id, text, metadata, relationships, ref_doc_id, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(node_id) DO UPDATE SET
                text = excluded.text,
                metadata = excluded.metadata,
                relationships = excluded.relationships,
                ref_doc_id = excluded.ref_doc_id,
                embedding = excluded.embedding
            "#,
            names.data
        );
        let clear_lexemes = format!("DELETE FROM {} WHERE node_id = ?1", names.lexemes);
        let insert_lexeme = format!(
            "INSERT INTO {} (node_id, lexeme, frequency) VALUES (?1, ?2, ?3)",
            names.lexemes
        );

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(nodes.len());
            {
                let mut upsert_stmt = tx.prepare_cached(&upsert)?;
                for item in nodes {
                    let node = &item.node;
                    upsert_stmt.execute(params![
                        node.id,
                        node.text,
                        serde_json::to_string(&node.metadata)?,
                        serde_json::to_string(&node.relationships)?,
                        node.ref_doc_id(),
                        codec::encode_embedding(&item.embedding),
                    ])?;

                    if hybrid {
                        tx.prepare_cached(&clear_lexemes)?.execute([&node.id])?;
                        let mut lexeme_stmt = tx.prepare_cached(&insert_lexeme)?;
                        for (lexeme, frequency) in self.inner.analyzer.document_terms(&node.text) {
                            lexeme_stmt.execute(params![node.id, lexeme, frequency])?;
                        }
                    }
                    ids.push(node.id.clone());
                }
            }
            tx.commit()?;
            tracing::debug!("Added {} nodes to {}", ids.len(), names.data);
            Ok(ids)
        })
    }

    fn delete_ref_doc(&self, ref_doc_id: &str) -> Result<()> {
        let names = &self.inner.names;
        let hybrid = self.hybrid_search();

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            if hybrid {
                tx.execute(
                    &format!(
                        "DELETE FROM {} WHERE node_id IN (SELECT node_id FROM {} WHERE ref_doc_id = ?1)",
                        names.lexemes, names.data
                    ),
                    [ref_doc_id],
                )?;
            }
            let removed = tx.execute(
                &format!("DELETE FROM {} WHERE ref_doc_id = ?1", names.data),
                [ref_doc_id],
            )?;
            tx.commit()?;
            tracing::debug!("Deleted {} nodes of document {} from {}", removed, ref_doc_id, names.data);
            Ok(())
        })
    }

    // ========== Read Operations ==========

    /// Nearest neighbours of `embedding` by cosine distance
    fn dense_query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filters: Option<&MetadataFilters>,
    ) -> Result<QueryResult> {
        self.check_dim(embedding)?;
        let predicate = filters::render(filters, "d.metadata")?;
        let sql = format!(
            r#"
            SELECT d.node_id, d.text, d.metadata, d.relationships,
                   {distance}(d.embedding, ?) AS distance
            FROM {data} AS d
            WHERE 1 = 1{filters}
            ORDER BY distance ASC, d.id ASC
            LIMIT ?
            "#,
            distance = COSINE_DISTANCE_FN,
            data = self.inner.names.data,
            filters = predicate.clause,
        );

        let mut bound = vec![Value::Blob(codec::encode_embedding(embedding))];
        bound.extend(predicate.params);
        bound.push(Value::Integer(limit(top_k)));

        let result = self.select_nodes(&sql, bound, |distance| (1.0 - distance) as f32)?;
        tracing::debug!("Dense query returned {} nodes", result.len());
        Ok(result)
    }

    /// Rows containing any lexeme of `query_str`, best rank first
    fn sparse_query(
        &self,
        query_str: &str,
        top_k: usize,
        filters: Option<&MetadataFilters>,
    ) -> Result<QueryResult> {
        let terms = self.inner.analyzer.query_terms(query_str);
        if terms.is_empty() {
            tracing::debug!("Sparse query {:?} has no searchable terms", query_str);
            return Ok(QueryResult::default());
        }

        let predicate = filters::render(filters, "d.metadata")?;
        let placeholders = vec!["?"; terms.len()].join(", ");
        let sql = format!(
            r#"
            SELECT d.node_id, d.text, d.metadata, d.relationships,
                   {rank} AS lexical_rank
            FROM {data} AS d
            JOIN {lexemes} AS l ON l.node_id = d.node_id
            WHERE l.lexeme IN ({placeholders}){filters}
            GROUP BY d.id
            ORDER BY lexical_rank DESC, d.id ASC
            LIMIT ?
            "#,
            rank = LEXICAL_RANK,
            data = self.inner.names.data,
            lexemes = self.inner.names.lexemes,
            placeholders = placeholders,
            filters = predicate.clause,
        );

        let mut bound: Vec<Value> = terms.into_iter().map(Value::Text).collect();
        bound.extend(predicate.params);
        bound.push(Value::Integer(limit(top_k)));

        let result = self.select_nodes(&sql, bound, |rank| rank as f32)?;
        tracing::debug!("Sparse query {:?} returned {} nodes", query_str, result.len());
        Ok(result)
    }

    /// Run a node-selecting statement; `score` maps the fifth column to a similarity
    fn select_nodes(
        &self,
        sql: &str,
        bound: Vec<Value>,
        score: impl Fn(f64) -> f32,
    ) -> Result<QueryResult> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(bound), |row| {
                let node = row_to_node(row)?;
                let raw: f64 = row.get(4)?;
                Ok((node, raw))
            })?;

            let mut result = QueryResult::default();
            for row in rows {
                let (node, raw) = row?;
                result.push(node, score(raw));
            }
            Ok(result)
        })
    }

    /// Get a stored node and its embedding by node id
    pub fn get(&self, node_id: &str) -> Result<Option<NodeWithEmbedding>> {
        let sql = format!(
            "SELECT node_id, text, metadata, relationships, embedding FROM {} WHERE node_id = ?1",
            self.inner.names.data
        );
        self.with_conn(|conn| {
            conn.query_row(&sql, [node_id], |row| {
                let node = row_to_node(row)?;
                let blob: Vec<u8> = row.get(4)?;
                Ok(NodeWithEmbedding::new(node, codec::decode_embedding(&blob)))
            })
            .optional()
            .map_err(Into::into)
        })
    }

    /// Count stored nodes
    pub fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.inner.names.data);
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let nodes = self.count()?;
        let lexemes = if self.hybrid_search() {
            let sql = format!("SELECT COUNT(*) FROM {}", self.inner.names.lexemes);
            self.with_conn(|conn| {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok(Some(count as usize))
            })?
        } else {
            None
        };

        Ok(StoreStats {
            table: self.inner.names.data.clone(),
            nodes,
            lexemes,
            embed_dim: self.embed_dim(),
            text_search_config: self.inner.analyzer.config(),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn add(&self, nodes: &[NodeWithEmbedding]) -> Result<Vec<String>> {
        self.insert_nodes(nodes)
    }

    fn query(&self, query: &VectorStoreQuery) -> Result<QueryResult> {
        if query.alpha.is_some() {
            tracing::warn!("alpha is not supported by hybrid fusion and will be ignored");
        }
        let filters = query.filters.as_ref();
        if query.mode.uses_text_search() {
            self.require_hybrid()?;
        }

        match query.mode {
            QueryMode::Default => {
                self.dense_query(query.require_embedding()?, query.similarity_top_k, filters)
            }
            QueryMode::Sparse => {
                let query_str = query.require_query_str()?;
                self.sparse_query(query_str, query.effective_sparse_top_k(), filters)
            }
            QueryMode::Hybrid => {
                let query_str = query.require_query_str()?;
                let embedding = query.require_embedding()?;
                let dense = self.dense_query(embedding, query.similarity_top_k, filters)?;
                let sparse = self.sparse_query(query_str, query.effective_sparse_top_k(), filters)?;
                Ok(fusion::fuse(dense, sparse))
            }
        }
    }

    fn delete(&self, ref_doc_id: &str) -> Result<()> {
        self.delete_ref_doc(ref_doc_id)
    }

    fn close_blocking(&self) -> Result<()> {
        let conn = self.lock().take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| Error::Storage(e))?;
            tracing::info!("Closed vector table {}", self.inner.names.data);
        }
        Ok(())
    }
}

/// Helper to convert the first four columns of a row to a TextNode
fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<TextNode> {
    let metadata_str: String = row.get(2)?;
    let relationships_str: String = row.get(3)?;

    let metadata = serde_json::from_str(&metadata_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let relationships = serde_json::from_str(&relationships_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(TextNode {
        id: row.get(0)?,
        text: row.get(1)?,
        metadata,
        relationships,
    })
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Write lexemes for every stored row; returns the number of rows indexed
fn backfill_lexemes(conn: &mut Connection, names: &TableNames, analyzer: &TextAnalyzer) -> Result<usize> {
    let tx = conn.transaction()?;
    let rows = {
        let mut select = tx.prepare(&format!("SELECT node_id, text FROM {} ORDER BY id", names.data))?;
        let rows = select
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut insert = tx.prepare(&format!(
            "INSERT OR REPLACE INTO {} (node_id, lexeme, frequency) VALUES (?1, ?2, ?3)",
            names.lexemes
        ))?;
        for (node_id, text) in &rows {
            for (lexeme, frequency) in analyzer.document_terms(text) {
                insert.execute(params![node_id, lexeme, frequency])?;
            }
        }
        rows.len()
    };
    tx.commit()?;
    Ok(rows)
}

fn limit(top_k: usize) -> i64 {
    i64::try_from(top_k).unwrap_or(i64::MAX)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Store statistics
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub table: String,
    pub nodes: usize,
    /// `None` when the store has no lexeme index
    pub lexemes: Option<usize>,
    pub embed_dim: usize,
    pub text_search_config: TextSearchConfig,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Table: {}", self.table)?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Embedding dim: {}", self.embed_dim)?;
        match self.lexemes {
            Some(lexemes) => writeln!(f, "  Lexemes: {} ({})", lexemes, self.text_search_config),
            None => writeln!(f, "  Lexemes: (hybrid search disabled)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ExactMatchFilter;

    fn sample(id: &str, text: &str, x: f32) -> NodeWithEmbedding {
        NodeWithEmbedding::new(TextNode::new(id, text).with_source(id), vec![x, 1.0])
    }

    #[test]
    fn test_node_crud() {
        let store = SqliteVectorStore::open_in_memory("crud", 2, false).unwrap();

        let node = sample("aaa", "lorem ipsum", 1.0);
        store.add(&[node.clone()]).unwrap();

        let retrieved = store.get("aaa").unwrap().unwrap();
        assert_eq!(retrieved, node);
        assert!(store.get("zzz").unwrap().is_none());
    }

    #[test]
    fn test_add_replaces_existing_id() {
        let store = SqliteVectorStore::open_in_memory("upsert", 2, true).unwrap();

        store.add(&[sample("aaa", "the quick fox", 1.0)]).unwrap();
        store.add(&[sample("aaa", "the lazy hound", 0.5)]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let retrieved = store.get("aaa").unwrap().unwrap();
        assert_eq!(retrieved.node.text, "the lazy hound");

        // stale lexemes are gone with the old text
        let q = VectorStoreQuery::default()
            .with_query_str("fox")
            .with_mode(QueryMode::Sparse)
            .with_sparse_top_k(5);
        assert!(store.query(&q).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let store = SqliteVectorStore::open_in_memory("dims", 2, false).unwrap();

        let bad = NodeWithEmbedding::new(TextNode::new("x", "x"), vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            store.add(&[bad]),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));

        let q = VectorStoreQuery::dense(vec![1.0], 1);
        assert!(matches!(store.query(&q), Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_sparse_requires_hybrid_store() {
        let store = SqliteVectorStore::open_in_memory("dense_only", 2, false).unwrap();
        let q = VectorStoreQuery::dense(vec![1.0, 1.0], 1)
            .with_query_str("fox")
            .with_mode(QueryMode::Sparse);
        assert!(matches!(store.query(&q), Err(Error::HybridSearchDisabled)));
    }

    #[test]
    fn test_dense_requires_embedding() {
        let store = SqliteVectorStore::open_in_memory("no_embedding", 2, false).unwrap();
        let q = VectorStoreQuery::default();
        assert!(matches!(store.query(&q), Err(Error::MissingQueryEmbedding)));
    }

    #[test]
    fn test_filter_on_numeric_metadata() {
        let store = SqliteVectorStore::open_in_memory("numeric", 2, false).unwrap();
        let mut first = sample("p1", "page one", 1.0);
        first.node = first.node.with_metadata("page", 1);
        let mut second = sample("p2", "page two", 1.0);
        second.node = second.node.with_metadata("page", 2);
        store.add(&[first, second]).unwrap();

        let q = VectorStoreQuery::dense(vec![1.0, 1.0], 10)
            .with_filters(MetadataFilters::new(vec![ExactMatchFilter::new("page", 2i64)]));
        assert_eq!(store.query(&q).unwrap().ids, vec!["p2"]);
    }

    #[test]
    fn test_closed_store_rejects_operations() {
        let store = SqliteVectorStore::open_in_memory("closing", 2, false).unwrap();
        let other_handle = store.clone();

        store.close_blocking().unwrap();
        assert!(other_handle.is_closed());
        assert!(matches!(other_handle.count(), Err(Error::Closed)));
        // closing twice is fine
        store.close_blocking().unwrap();
    }

    #[test]
    fn test_stats() {
        let store = SqliteVectorStore::open_in_memory("stats", 2, true).unwrap();
        store.add(&[sample("ddd", "The fox and the hound", 10.0)]).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.table, "data_stats");
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.lexemes, Some(2)); // fox, hound
    }
}
