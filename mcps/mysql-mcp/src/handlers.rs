//! MySQL tool and resource handlers
//!
//! Each handler takes the executor and the request and produces the MCP
//! response. Generic over the backend so tests can use the scripted one.

use mcp_common::{
    internal_error, json_resource_contents, resource, resource_not_found, resource_template,
    structured_error, structured_success, CallToolResult, McpError,
};
use rmcp::model::{ReadResourceResult, Resource, ResourceTemplate};
use tracing::info;

use crate::backend::ConnectionSource;
use crate::executor::Executor;
use crate::params::QueryParams;
use crate::router::{CatalogQuery, DATABASES_URI, SCHEMA_TEMPLATE, TABLES_TEMPLATE};
use crate::types::{ExecError, QueryOutput};

// ============================================================================
// Tools
// ============================================================================

/// Run a caller-supplied query
///
/// Rejections and execution failures are tool errors carrying an empty
/// result, never protocol errors.
pub async fn run_query<S: ConnectionSource>(
    executor: &Executor<S>,
    params: QueryParams,
) -> Result<CallToolResult, McpError> {
    if let Err(reason) = executor.classifier().classify(&params.query) {
        info!("Rejected tool query: {}", reason);
        return structured_error(&QueryOutput::empty(), ExecError::Rejected.to_string());
    }

    match executor.execute(&params.query).await {
        Ok(output) => structured_success(&output),
        Err(e) => structured_error(&QueryOutput::empty(), e.to_string()),
    }
}

// ============================================================================
// Resources
// ============================================================================

pub fn catalog_resources() -> Vec<Resource> {
    vec![resource(
        DATABASES_URI,
        "mysql_databases",
        "List databases visible to the configured user",
    )]
}

pub fn catalog_templates() -> Result<Vec<ResourceTemplate>, McpError> {
    Ok(vec![
        resource_template(TABLES_TEMPLATE, "mysql_tables", "List tables in a database")?,
        resource_template(
            SCHEMA_TEMPLATE,
            "mysql_schema",
            "Describe the columns of a table",
        )?,
    ])
}

/// Resolve `uri` to a catalog query and run it
pub async fn read_catalog<S: ConnectionSource>(
    executor: &Executor<S>,
    uri: &str,
) -> Result<ReadResourceResult, McpError> {
    let query = CatalogQuery::resolve(uri).map_err(|e| resource_not_found(&e.uri))?;

    let output = executor
        .execute(&query.sql())
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok(ReadResourceResult {
        contents: vec![json_resource_contents(uri, &output)?],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mcp_common::text_contents;
    use rmcp::model::{ErrorCode, ResourceContents};
    use serde_json::json;

    use crate::backend::scripted::{Event, Script, ScriptedSource};
    use crate::classifier::{AdmissionPolicy, StatementClassifier};
    use crate::executor::ExecutionLimits;
    use crate::value::RawValue;

    fn executor(script: Script) -> Executor<ScriptedSource> {
        Executor::new(
            ScriptedSource::new(script),
            Arc::new(StatementClassifier::new(AdmissionPolicy::new(
                vec![],
                vec!["for update".to_string()],
            ))),
            ExecutionLimits::default(),
        )
    }

    fn params(query: &str) -> QueryParams {
        QueryParams {
            query: query.to_string(),
        }
    }

    fn users() -> Script {
        Script::rows(
            &["id"],
            vec![
                vec![RawValue::Int(1)],
                vec![RawValue::Int(2)],
                vec![RawValue::Int(3)],
            ],
        )
    }

    #[tokio::test]
    async fn test_query_success() {
        let exec = executor(users());
        let result = run_query(&exec, params("SELECT * FROM users")).await.unwrap();

        assert!(!result.is_error.unwrap_or(false));
        assert_eq!(
            result.structured_content,
            Some(json!({
                "columns": ["id"],
                "rows": [[1], [2], [3]],
                "rowCount": 3,
                "truncated": false
            }))
        );
    }

    #[tokio::test]
    async fn test_multi_statement_rejected_before_executor() {
        let exec = executor(users());
        let result = run_query(&exec, params("select 1; select 2")).await.unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            result.structured_content,
            Some(json!({"columns": [], "rows": [], "rowCount": 0, "truncated": false}))
        );
        let texts: Vec<&str> = text_contents(&result).collect();
        assert_eq!(texts, vec!["only read-only queries are allowed"]);
        assert!(exec.source().events().is_empty());
    }

    #[tokio::test]
    async fn test_locking_read_rejected() {
        let exec = executor(users());
        let result = run_query(&exec, params("select * from t for update"))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_commit_failure_is_tool_error() {
        let exec = executor(Script {
            fail_commit: Some("deadlock".to_string()),
            ..users()
        });
        let result = run_query(&exec, params("SELECT * FROM users")).await.unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            result.structured_content,
            Some(serde_json::to_value(QueryOutput::empty()).unwrap())
        );
        let texts: Vec<&str> = text_contents(&result).collect();
        assert_eq!(texts, vec!["failed to commit: deadlock"]);
    }

    #[tokio::test]
    async fn test_read_tables_resource() {
        let exec = executor(Script::rows(
            &["Tables_in_my_db"],
            vec![vec![RawValue::Bytes(b"orders".to_vec())]],
        ));
        let result = read_catalog(&exec, "mysql://tables/my_db").await.unwrap();

        assert!(exec
            .source()
            .events()
            .contains(&Event::Query("SHOW TABLES FROM `my_db`".to_string())));

        match &result.contents[0] {
            ResourceContents::TextResourceContents {
                uri,
                mime_type,
                text,
                ..
            } => {
                assert_eq!(uri, "mysql://tables/my_db");
                assert_eq!(mime_type.as_deref(), Some("application/json"));
                let body: serde_json::Value = serde_json::from_str(text).unwrap();
                assert_eq!(body["rows"], json!([["orders"]]));
                assert_eq!(body["rowCount"], json!(1));
            }
            other => panic!("expected text contents, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_schema_resource() {
        let exec = executor(Script::default());
        read_catalog(&exec, "mysql://schema/shop/orders").await.unwrap();
        assert!(exec
            .source()
            .events()
            .contains(&Event::Query("DESCRIBE `shop`.`orders`".to_string())));
    }

    #[tokio::test]
    async fn test_invalid_identifier_not_found() {
        let exec = executor(users());
        let err = read_catalog(&exec, "mysql://tables/my-db;%20drop")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert!(exec.source().events().is_empty());
    }

    #[tokio::test]
    async fn test_failing_catalog_query_is_internal_error() {
        let exec = executor(Script {
            fail_query: Some("Unknown database 'ghost'".to_string()),
            ..Script::default()
        });
        let err = read_catalog(&exec, "mysql://tables/ghost").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("Unknown database"));
    }

    #[test]
    fn test_catalog_listing() {
        let resources = catalog_resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].raw.uri, "mysql://databases");

        let templates = catalog_templates().unwrap();
        let uris: Vec<&str> = templates.iter().map(|t| t.raw.uri_template.as_str()).collect();
        assert_eq!(uris, vec!["mysql://tables/{db}", "mysql://schema/{db}/{table}"]);
    }
}
