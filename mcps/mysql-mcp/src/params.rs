//! Parameter types for MySQL MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryParams {
    #[schemars(
        description = "A single read-only SQL statement (SELECT, SHOW, DESCRIBE or EXPLAIN). Semicolons are not allowed."
    )]
    pub query: String,
}
