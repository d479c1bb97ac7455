//! Database schema definitions

use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

static TABLE_NAME_RE: OnceLock<Regex> = OnceLock::new();

/// Physical table names derived from a logical table name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// Rows: one per node
    pub data: String,
    /// Lexeme index: one row per (node, lexeme)
    pub lexemes: String,
}

impl TableNames {
    /// Validate `table_name` and derive the physical names.
    ///
    /// Names are interpolated into SQL, so only `[A-Za-z0-9_]` is accepted.
    pub fn new(table_name: &str) -> Result<Self> {
        let re = TABLE_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static table name pattern"));
        if !re.is_match(table_name) {
            return Err(Error::InvalidTableName(table_name.to_string()));
        }

        let data = format!("data_{}", table_name.to_lowercase());
        let lexemes = format!("{}_lexemes", data);
        Ok(Self { data, lexemes })
    }
}

/// SQL to create the data table
pub fn create_data_table(names: &TableNames) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {data} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id TEXT NOT NULL UNIQUE,
    text TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{{}}',
    relationships TEXT NOT NULL DEFAULT '{{}}',
    ref_doc_id TEXT,
    embedding BLOB NOT NULL
)
"#,
        data = names.data
    )
}

/// SQL to create the lexeme index table
pub fn create_lexeme_table(names: &TableNames) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {lexemes} (
    node_id TEXT NOT NULL,
    lexeme TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    PRIMARY KEY (node_id, lexeme)
)
"#,
        lexemes = names.lexemes
    )
}

/// SQL to create indexes
pub fn create_indexes(names: &TableNames, hybrid_search: bool) -> Vec<String> {
    let mut stmts = vec![format!(
        "CREATE INDEX IF NOT EXISTS idx_{data}_ref_doc ON {data}(ref_doc_id)",
        data = names.data
    )];
    if hybrid_search {
        stmts.push(format!(
            "CREATE INDEX IF NOT EXISTS idx_{lexemes}_lexeme ON {lexemes}(lexeme)",
            lexemes = names.lexemes
        ));
    }
    stmts
}

/// All schema creation statements
pub fn all_schema_statements(names: &TableNames, hybrid_search: bool) -> Vec<String> {
    let mut stmts = vec![create_data_table(names)];
    if hybrid_search {
        stmts.push(create_lexeme_table(names));
    }
    stmts.extend(create_indexes(names, hybrid_search));
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_are_prefixed() {
        let names = TableNames::new("lorem_ipsum").unwrap();
        assert_eq!(names.data, "data_lorem_ipsum");
        assert_eq!(names.lexemes, "data_lorem_ipsum_lexemes");
    }

    #[test]
    fn test_table_name_rejects_sql() {
        assert!(matches!(TableNames::new("x; DROP TABLE y"), Err(Error::InvalidTableName(_))));
        assert!(TableNames::new("").is_err());
    }

    #[test]
    fn test_lexeme_table_only_when_hybrid() {
        let names = TableNames::new("docs").unwrap();
        let dense_only = all_schema_statements(&names, false);
        assert!(dense_only.iter().all(|s| !s.contains("_lexemes")));

        let hybrid = all_schema_statements(&names, true);
        assert!(hybrid.iter().any(|s| s.contains("CREATE TABLE IF NOT EXISTS data_docs_lexemes")));
    }
}
