//! MySQL MCP Server implementation

use std::sync::Arc;

use mcp_common::McpError;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerCapabilities,
        ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router, RoleServer,
};

use crate::backend::MySqlSource;
use crate::classifier::StatementClassifier;
use crate::config::{Config, ServerConfig};
use crate::executor::Executor;
use crate::handlers;
use crate::params::QueryParams;

/// Read-only MySQL MCP Server
#[derive(Clone)]
pub struct MysqlMcpServer {
    executor: Arc<Executor<MySqlSource>>,
    identity: ServerConfig,
    tool_router: ToolRouter<Self>,
}

impl MysqlMcpServer {
    /// Create a server over `source` with the policy and limits from `config`
    pub fn new(source: MySqlSource, config: &Config) -> Self {
        let classifier = Arc::new(StatementClassifier::new(config.mysql.admission_policy()));
        let executor = Executor::new(source, classifier, config.mysql.limits());

        tracing::info!(
            "Admitting {:?} with {} deny fragments, {} row cap, {}s timeout",
            config.mysql.allow_statement_prefixes,
            config.mysql.deny_substrings.len(),
            executor.limits().max_rows,
            executor.limits().timeout.as_secs()
        );

        Self {
            executor: Arc::new(executor),
            identity: config.server.clone(),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MysqlMcpServer {
    #[tool(
        description = "Run a read-only SQL query against MySQL. Accepts a single SELECT, SHOW, DESCRIBE or EXPLAIN statement and returns columns, rows, rowCount and a truncated flag when the row cap was hit."
    )]
    async fn mysql_query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::run_query(&self.executor, params).await
    }
}

#[tool_handler]
impl rmcp::ServerHandler for MysqlMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: self.identity.name.clone(),
                version: self.identity.version.clone(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Read-only MySQL server. Use mysql_query to run SELECT, SHOW, DESCRIBE and \
                EXPLAIN statements inside a read-only transaction. Browse the catalog with \
                the mysql://databases, mysql://tables/{db} and mysql://schema/{db}/{table} \
                resources."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult::with_all_items(
            handlers::catalog_resources(),
        ))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult::with_all_items(
            handlers::catalog_templates()?,
        ))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        handlers::read_catalog(&self.executor, &request.uri).await
    }
}
