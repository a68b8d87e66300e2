use std::path::PathBuf;

use clap::Parser;

/// MCP server for semantic document search and ingestion.
///
/// Speaks JSON-RPC 2.0 on stdin/stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "semdoc-mcp", version, about = "MCP server for semantic document search")]
pub struct CliArgs {
    /// Load environment variables from this file instead of `.env`
    #[arg(long, env = "SEMDOC_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Server name reported to clients during `initialize`
    #[arg(long, default_value = "semdoc-mcp")]
    pub name: String,

    /// Log filter (e.g. `debug`, `semdoc_mcp=trace`); overrides RUST_LOG
    #[arg(long)]
    pub log_level: Option<String>,
}
