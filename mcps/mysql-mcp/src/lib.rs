//! MySQL MCP Library
//!
//! Read-only MySQL access over MCP. Query text is admitted by the
//! [`StatementClassifier`], then run by the [`Executor`] on a dedicated
//! connection inside a read-only transaction with a deadline and a row cap.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use mysql_mcp::{Config, MySqlSource, MysqlMcpServer};
//!
//! let config = Config::load(path)?;
//! let source = MySqlSource::connect_lazy(&config.mysql)?;
//! let server = MysqlMcpServer::new(source, &config);
//! ```

pub mod backend;
pub mod classifier;
pub mod config;
pub mod dsn;
pub mod executor;
pub mod handlers;
pub mod params;
pub mod router;
pub mod server;
pub mod types;
pub mod value;

pub use backend::{ConnectionSource, MySqlSource, Session};
pub use classifier::{is_read_only_query, AdmissionPolicy, Rejection, StatementClassifier};
pub use config::Config;
pub use executor::{ExecutionLimits, Executor};
pub use params::QueryParams;
pub use router::CatalogQuery;
pub use server::MysqlMcpServer;
pub use types::{ExecError, QueryOutput, Value};
