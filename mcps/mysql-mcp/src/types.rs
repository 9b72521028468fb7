//! Core types for the MySQL MCP server

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized scalar cell value, serialized as a bare JSON scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// Bounded result of one query
///
/// Every row has one value per column and `row_count == rows.len()`.
/// `truncated` is set when the engine had more rows than the configured cap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    pub truncated: bool,
}

impl QueryOutput {
    /// The empty result sent alongside every error
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>, truncated: bool) -> Self {
        Self {
            columns,
            row_count: rows.len(),
            rows,
            truncated,
        }
    }
}

/// Errors produced while executing a query
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("only read-only queries are allowed")]
    Rejected,

    #[error("failed to acquire connection: {0}")]
    Acquire(String),

    #[error("failed to begin read-only transaction: {0}")]
    Begin(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("failed to read rows: {0}")]
    Scan(String),

    #[error("failed to commit: {0}")]
    Commit(String),

    #[error("query timed out after {0}s")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_serializes_camel_case() {
        let output = QueryOutput::new(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![Value::Integer(1), Value::Null]],
            true,
        );
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "columns": ["id", "name"],
                "rows": [[1, null]],
                "rowCount": 1,
                "truncated": true
            })
        );
    }

    #[test]
    fn test_empty_output_shape() {
        assert_eq!(
            serde_json::to_value(QueryOutput::empty()).unwrap(),
            json!({"columns": [], "rows": [], "rowCount": 0, "truncated": false})
        );
    }

    #[test]
    fn test_values_are_bare_scalars() {
        let row = vec![
            Value::Null,
            Value::Bool(true),
            Value::Integer(-3),
            Value::Float(1.5),
            Value::from("x"),
        ];
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!([null, true, -3, 1.5, "x"])
        );
    }

    #[test]
    fn test_rejected_message() {
        assert_eq!(
            ExecError::Rejected.to_string(),
            "only read-only queries are allowed"
        );
    }
}
