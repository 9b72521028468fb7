//! Resource router
//!
//! Maps `mysql://` locators onto fixed catalog queries. Interpolated
//! identifiers are restricted to `[A-Za-z0-9_]` before they are quoted.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

pub const DATABASES_URI: &str = "mysql://databases";
pub const TABLES_TEMPLATE: &str = "mysql://tables/{db}";
pub const SCHEMA_TEMPLATE: &str = "mysql://schema/{db}/{table}";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// The locator does not name a known catalog resource
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("resource not found: {uri}")]
pub struct NotFound {
    pub uri: String,
}

/// A catalog query selected by a resource locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    Databases,
    Tables { database: String },
    Schema { database: String, table: String },
}

impl CatalogQuery {
    /// Resolve a locator, or report it as not found
    pub fn resolve(uri: &str) -> Result<Self, NotFound> {
        let not_found = || NotFound {
            uri: uri.to_string(),
        };

        let parsed = Url::parse(uri).map_err(|_| not_found())?;
        if parsed.scheme() != "mysql" {
            return Err(not_found());
        }

        let host = parsed.host_str().ok_or_else(not_found)?.to_ascii_lowercase();
        // Empty segments count, so `tables//db` and `tables/db/` do not resolve
        let path = parsed.path();
        let path = path.strip_prefix('/').unwrap_or(path);
        let segments: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };

        let query = match (host.as_str(), segments.as_slice()) {
            ("databases", []) => CatalogQuery::Databases,
            ("tables", [database]) => CatalogQuery::Tables {
                database: database.to_string(),
            },
            ("schema", [database, table]) => CatalogQuery::Schema {
                database: database.to_string(),
                table: table.to_string(),
            },
            _ => return Err(not_found()),
        };

        if query.identifiers().iter().all(|id| is_identifier(id)) {
            Ok(query)
        } else {
            Err(not_found())
        }
    }

    /// The SQL run for this resource
    pub fn sql(&self) -> String {
        match self {
            CatalogQuery::Databases => "SHOW DATABASES".to_string(),
            CatalogQuery::Tables { database } => format!("SHOW TABLES FROM `{}`", database),
            CatalogQuery::Schema { database, table } => {
                format!("DESCRIBE `{}`.`{}`", database, table)
            }
        }
    }

    fn identifiers(&self) -> Vec<&str> {
        match self {
            CatalogQuery::Databases => vec![],
            CatalogQuery::Tables { database } => vec![database.as_str()],
            CatalogQuery::Schema { database, table } => vec![database.as_str(), table.as_str()],
        }
    }
}

pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER.is_match(value)
}
