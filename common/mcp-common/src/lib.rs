//! MCP Common - Shared utilities for the MySQL MCP server and its client
//!
//! This crate provides the plumbing both sides of the wire need:
//!
//! - **Initialization**: [`init_tracing`] for stderr logging (stdout carries MCP)
//!   and [`serve_stdio`] to run a server over the stdio transport
//! - **Results**: helpers for structured `CallToolResult` responses and for
//!   reading them back on the client side
//! - **Resources**: builders for resources, templates and JSON resource contents
//! - **Errors**: conversions into `rmcp::ErrorData`
//!
//! # Example
//!
//! ```rust,ignore
//! use mcp_common::{structured_error, structured_success};
//!
//! fn my_tool(&self) -> Result<CallToolResult, McpError> {
//!     match compute() {
//!         Ok(output) => structured_success(&output),
//!         Err(e) => structured_error(&Output::empty(), e.to_string()),
//!     }
//! }
//! ```

pub mod error;
pub mod init;
pub mod resource;
pub mod result;

// Re-export commonly used items at crate root
pub use error::{internal_error, resource_not_found, IntoMcpError, McpResult, ResultExt};
pub use init::{init_tracing, serve_stdio, LogFormat};
pub use resource::{json_resource_contents, resource, resource_template, JSON_MIME_TYPE};
pub use result::{structured_error, structured_success, text_contents};

// Re-export rmcp types that are commonly needed
pub use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
