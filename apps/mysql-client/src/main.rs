//! mysql-client - run one read-only query through the MySQL MCP server

use std::time::Duration;

use clap::Parser;
use mysql_client::{run, validate_query, RmcpSession};

#[derive(Parser, Debug)]
#[command(
    name = "mysql-client",
    version,
    about = "Run a read-only SQL query through the MySQL MCP server"
)]
struct Args {
    /// Read-only SQL query to run
    #[arg(long, default_value = "SELECT 1")]
    query: String,

    /// Server command to spawn
    #[arg(long, env = "MYSQL_MCP_SERVER", default_value = "mysql-mcp")]
    server: String,

    /// Seconds to wait for the tool call
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Arguments passed to the server, after `--`
    #[arg(last = true)]
    server_args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    mcp_common::init_tracing("mysql_client")?;

    validate_query(&args.query)?;

    let mut session = RmcpSession::spawn(
        &args.server,
        &args.server_args,
        Duration::from_secs(args.timeout_secs),
    )
    .await?;

    let outcome = run(&mut session, &args.query, &mut std::io::stdout()).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close session: {}", e);
    }

    outcome
}
