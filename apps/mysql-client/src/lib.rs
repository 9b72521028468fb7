//! MySQL MCP client
//!
//! Spawns the MySQL MCP server as a child process, calls `mysql_query` once
//! and renders the result.

use std::io::Write;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use mcp_common::text_contents;
use rmcp::{
    model::{CallToolRequestParam, CallToolResult, RawContent},
    service::RunningService,
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use tokio::process::Command;

/// Name of the query tool exposed by the server
pub const QUERY_TOOL: &str = "mysql_query";

/// The part of an MCP client session `run` needs
#[async_trait]
pub trait ToolSession: Send {
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult>;
}

/// Session with a server spawned over stdio
pub struct RmcpSession {
    service: RunningService<RoleClient, ()>,
    tool_timeout: Duration,
}

impl RmcpSession {
    /// Spawn `command` with `args` and complete the MCP handshake
    pub async fn spawn(command: &str, args: &[String], tool_timeout: Duration) -> Result<Self> {
        tracing::debug!("Spawning MCP server: {} {:?}", command, args);

        let mut cmd = Command::new(command);
        cmd.args(args);

        let transport = TokioChildProcess::new(cmd)
            .with_context(|| format!("Failed to spawn '{}'", command))?;
        let service = ().serve(transport).await?;

        Ok(Self {
            service,
            tool_timeout,
        })
    }

    pub async fn close(self) -> Result<()> {
        self.service.cancel().await?;
        Ok(())
    }
}

#[async_trait]
impl ToolSession for RmcpSession {
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        tokio::time::timeout(
            self.tool_timeout,
            self.service.call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
                task: None,
            }),
        )
        .await
        .map_err(|_| anyhow!("Tool '{}' timed out after {:?}", name, self.tool_timeout))?
        .map_err(anyhow::Error::from)
    }
}

/// Reject an empty query before anything is spawned
pub fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("--query is required");
    }
    Ok(())
}

/// Call the query tool and write the rendered result to `out`
pub async fn run<S: ToolSession + ?Sized>(
    session: &mut S,
    query: &str,
    out: &mut dyn Write,
) -> Result<()> {
    validate_query(query)?;

    let mut arguments = Map::new();
    arguments.insert("query".to_string(), Value::String(query.to_string()));

    let result = session
        .call_tool(QUERY_TOOL, arguments)
        .await
        .map_err(|e| anyhow!("CallTool failed: {:#}", e))?;

    let rendered = render(&result)?;
    writeln!(out, "{}", rendered)?;
    Ok(())
}

/// Turn a tool result into printable text, or into an error when the tool failed
///
/// Structured content wins over text content in both cases.
pub fn render(result: &CallToolResult) -> Result<String> {
    if result.is_error.unwrap_or(false) {
        if let Some(structured) = &result.structured_content {
            if let Ok(pretty) = serde_json::to_string_pretty(structured) {
                bail!("tool failed: {}", pretty);
            }
        }
        if let Some(text) = text_contents(result).next() {
            bail!("tool failed: {}", text);
        }
        bail!("tool failed");
    }

    if let Some(structured) = &result.structured_content {
        return serde_json::to_string_pretty(structured)
            .context("failed to marshal structured content");
    }

    let mut lines = Vec::with_capacity(result.content.len());
    for content in &result.content {
        match &content.raw {
            RawContent::Text(text) => lines.push(text.text.clone()),
            other => match serde_json::to_string_pretty(other) {
                Ok(json) => lines.push(json),
                Err(_) => lines.push("(unserializable content)".to_string()),
            },
        }
    }
    Ok(lines.join("\n"))
}
