//! MySQL MCP Server
//!
//! Serves read-only MySQL queries and catalog resources over stdio.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mysql_mcp::{Config, MySqlSource, MysqlMcpServer};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "mysql-mcp", version, about = "Read-only MySQL MCP server")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "MYSQL_MCP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    mcp_common::init_tracing("mysql_mcp")?;

    tracing::info!("Starting mysql_mcp MCP Server");

    let path = Config::locate(args.config.as_deref())?;
    let config = Config::load(&path)?;
    config.validate()?;

    let source = MySqlSource::connect_lazy(&config.mysql)?;
    source
        .ping(PING_TIMEOUT)
        .await
        .context("failed to reach MySQL")?;
    tracing::info!("Connected to MySQL");

    let server = MysqlMcpServer::new(source, &config);
    mcp_common::serve_stdio(server).await
}
