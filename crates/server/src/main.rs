mod cli;
mod startup;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use semdoc_core::config::{load_dotenv, load_env_file};
use semdoc_core::Config;
use semdoc_mcp::{McpServer, StdioTransport};
use semdoc_tool_runtime::ToolRegistry;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // stdout carries the protocol; logs go to stderr.
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &args.env_file {
        Some(path) => load_env_file(path)?,
        None => load_dotenv(),
    }

    let config = Config::from_env();
    config.log_summary();
    config.validate().context("configuration is incomplete")?;

    let context = startup::build_context(&config);
    let registry = ToolRegistry::with_builtin_tools()?;

    let mut server = McpServer::new(registry, context).with_name(&args.name);
    let mut transport = StdioTransport::new();
    server.run(&mut transport).await?;

    info!("server stopped");
    Ok(())
}
