//! Structured tool results
//!
//! Tools in this workspace always answer with structured content, on success
//! and on failure, so that clients see one stable output shape.

use rmcp::model::{CallToolResult, Content, RawContent};
use serde::Serialize;

use crate::error::{McpResult, ResultExt};

/// Create a successful structured response
///
/// The text content carries the same JSON for clients that ignore
/// `structuredContent`.
pub fn structured_success<T: Serialize>(data: &T) -> McpResult<CallToolResult> {
    let value = serde_json::to_value(data).to_mcp_err()?;
    Ok(CallToolResult::structured(value))
}

/// Create a failed structured response
///
/// `data` is the empty form of the tool's output; `message` becomes the
/// single text content item.
pub fn structured_error<T: Serialize>(
    data: &T,
    message: impl Into<String>,
) -> McpResult<CallToolResult> {
    let value = serde_json::to_value(data).to_mcp_err()?;
    let mut result = CallToolResult::structured_error(value);
    result.content = vec![Content::text(message.into())];
    Ok(result)
}

/// Iterate over the text items of a tool result
pub fn text_contents(result: &CallToolResult) -> impl Iterator<Item = &str> {
    result.content.iter().filter_map(|content| match &content.raw {
        RawContent::Text(text) => Some(text.text.as_str()),
        _ => None,
    })
}
