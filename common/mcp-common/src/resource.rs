//! Resource helpers
//!
//! Builders for advertised resources and for JSON-encoded resource contents.

use rmcp::{
    model::{AnnotateAble, RawResource, Resource, ResourceContents, ResourceTemplate},
    ErrorData as McpError,
};
use serde::Serialize;
use serde_json::json;

use crate::error::ResultExt;

/// MIME type used for every JSON resource body
pub const JSON_MIME_TYPE: &str = "application/json";

/// Build a concrete JSON resource entry for `list_resources`
pub fn resource(uri: &str, name: &str, description: &str) -> Resource {
    RawResource {
        description: Some(description.to_string()),
        mime_type: Some(JSON_MIME_TYPE.to_string()),
        ..RawResource::new(uri, name.to_string())
    }
    .no_annotation()
}

/// Build a JSON resource template entry for `list_resource_templates`
///
/// Built from its wire form so optional protocol fields keep their defaults.
pub fn resource_template(
    uri_template: &str,
    name: &str,
    description: &str,
) -> Result<ResourceTemplate, McpError> {
    serde_json::from_value(json!({
        "uriTemplate": uri_template,
        "name": name,
        "description": description,
        "mimeType": JSON_MIME_TYPE,
    }))
    .map_err(|e| McpError::internal_error(format!("invalid resource template: {}", e), None))
}

/// Serialize `data` as the JSON body of the resource at `uri`
pub fn json_resource_contents<T: Serialize>(
    uri: &str,
    data: &T,
) -> Result<ResourceContents, McpError> {
    let encoded = serde_json::to_string(data).to_mcp_err()?;

    let mut contents = ResourceContents::text(encoded, uri);
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
        *mime_type = Some(JSON_MIME_TYPE.to_string());
    }
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_is_json() {
        let res = resource("mysql://databases", "mysql_databases", "List databases");
        assert_eq!(res.raw.uri, "mysql://databases");
        assert_eq!(res.raw.mime_type.as_deref(), Some(JSON_MIME_TYPE));
    }

    #[test]
    fn test_resource_template_fields() {
        let template =
            resource_template("mysql://tables/{db}", "mysql_tables", "List tables").unwrap();
        assert_eq!(template.raw.uri_template, "mysql://tables/{db}");
        assert_eq!(template.raw.name, "mysql_tables");
        assert_eq!(template.raw.mime_type.as_deref(), Some(JSON_MIME_TYPE));
    }

    #[test]
    fn test_json_resource_contents() {
        let contents = json_resource_contents("mysql://databases", &json!({"rowCount": 0})).unwrap();
        match contents {
            ResourceContents::TextResourceContents {
                uri,
                mime_type,
                text,
                ..
            } => {
                assert_eq!(uri, "mysql://databases");
                assert_eq!(mime_type.as_deref(), Some(JSON_MIME_TYPE));
                assert_eq!(text, r#"{"rowCount":0}"#);
            }
            other => panic!("expected text contents, got {:?}", other),
        }
    }
}
