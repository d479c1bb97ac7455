//! Metadata filters rendered as SQL predicates
//!
//! Metadata is stored as a JSON object, so an exact-match filter becomes
//! `json_extract(<column>, '$."key"') = ?`. Placeholders are positional
//! (`?`), the caller binds `params` in order after its own leading params.

use super::types::{FilterValue, MetadataFilters};
use crate::{Error, Result};
use rusqlite::types::Value;

/// A SQL fragment with its bound values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlPredicate {
    /// Either empty or a sequence of ` AND ...` terms
    pub clause: String,
    pub params: Vec<Value>,
}

impl SqlPredicate {
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }
}

/// Render `filters` against the JSON metadata `column`
pub fn render(filters: Option<&MetadataFilters>, column: &str) -> Result<SqlPredicate> {
    let mut predicate = SqlPredicate::default();
    let Some(filters) = filters else {
        return Ok(predicate);
    };

    for filter in &filters.filters {
        predicate.clause.push_str(&format!(" AND json_extract({}, ?) = ?", column));
        predicate.params.push(Value::Text(json_path(&filter.key)?));
        predicate.params.push(sql_value(&filter.value));
    }

    Ok(predicate)
}

/// JSON path selecting a top-level key, quoted so dots and spaces are literal
fn json_path(key: &str) -> Result<String> {
    if key.is_empty() || key.contains('"') {
        return Err(Error::InvalidFilter(format!("unsupported metadata key: {:?}", key)));
    }
    Ok(format!("$.\"{}\"", key))
}

fn sql_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Integer(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::Text(s) => Value::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::ExactMatchFilter;

    #[test]
    fn test_no_filters_renders_nothing() {
        assert!(render(None, "d.metadata").unwrap().is_empty());
        assert!(render(Some(&MetadataFilters::default()), "d.metadata").unwrap().is_empty());
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let filters = MetadataFilters::new(vec![
            ExactMatchFilter::new("test_key", "test_value"),
            ExactMatchFilter::new("page", 3i64),
        ]);
        let predicate = render(Some(&filters), "d.metadata").unwrap();

        assert_eq!(
            predicate.clause,
            " AND json_extract(d.metadata, ?) = ? AND json_extract(d.metadata, ?) = ?"
        );
        assert_eq!(predicate.params[0], Value::Text("$.\"test_key\"".into()));
        assert_eq!(predicate.params[1], Value::Text("test_value".into()));
        assert_eq!(predicate.params[3], Value::Integer(3));
    }

    #[test]
    fn test_quoted_key_rejected() {
        let filters = MetadataFilters::new(vec![ExactMatchFilter::new("bad\"key", "x")]);
        assert!(matches!(render(Some(&filters), "metadata"), Err(Error::InvalidFilter(_))));
    }
}
