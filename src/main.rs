//! halo-manager MCP Server & CLI (Rust)
//!
//! Dual-mode application:
//! - MCP Server Mode (default): Model Context Protocol server using stdio
//! - CLI Mode: Command-line utility for direct tool execution
//!
//! Implements four tools:
//! - `publish_blog_post(title, content, slug?)`
//! - `get_blog_comments(post_id?, limit)`
//! - `reply_blog_comment(target_hint, content)`
//! - `upload_blog_image(source_url, storage_policy?)`

mod cli;
mod config;
mod error;
mod halo;
mod http;
mod mcp;
mod tools;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::AppError;
use halo::Halo;
use mcp::ToolResult;
use std::sync::Arc;
use tools::registry::{guarded, ToolRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match Config::load(&cli.connection.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        None | Some(Commands::Serve) => run_mcp_mode(&config).await,
        Some(Commands::Tools) => {
            println!("{}", serde_json::to_string_pretty(&ToolRegistry::new().list())?);
            Ok(())
        }
        Some(Commands::Publish(args)) => {
            let halo = connect(&config);
            report(guarded(tools::publish::NAME, tools::publish::execute_publish(&halo, args)).await)
        }
        Some(Commands::Comments(args)) => {
            let halo = connect(&config);
            report(guarded(tools::comments::NAME, tools::comments::execute_comments(&halo, args)).await)
        }
        Some(Commands::Reply(args)) => {
            let halo = connect(&config);
            report(guarded(tools::reply::NAME, tools::reply::execute_reply(&halo, args)).await)
        }
        Some(Commands::Upload(args)) => {
            let halo = connect(&config);
            report(guarded(tools::upload::NAME, tools::upload::execute_upload(&halo, args)).await)
        }
    }
}

/// Initialize logging based on verbosity flags; logs go to stderr to keep stdout clean
fn init_logging(cli: &Cli) {
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the backend components, exiting if the credential is unusable
fn connect(config: &Config) -> Halo {
    match Halo::from_config(config) {
        Ok(halo) => halo,
        Err(e) => {
            eprintln!("Error: {}", e.message());
            std::process::exit(e.exit_code());
        }
    }
}

/// Print the tool output, or the error with its exit code
fn report(result: Result<ToolResult, AppError>) -> Result<()> {
    match result {
        Ok(tool_result) => {
            println!("{}", tool_result.first_text());
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e.message());
            std::process::exit(e.exit_code());
        }
    }
}

/// Run in MCP server mode
async fn run_mcp_mode(config: &Config) -> Result<()> {
    let halo = connect(config);
    info!("Starting halo-manager MCP Server");

    mcp::handle_stdio(Arc::new(halo)).await?;

    Ok(())
}
