//! Entry point for tether, a tool-using LLM agent for the terminal.
//!
//! This binary loads environment variables, installs the tracing subscriber,
//! parses CLI arguments via [`cli`], and dispatches the chosen subcommand.

mod agent;
mod chat;
mod cli;
mod config;
mod constants;
mod conversation;
mod format;
mod message;
mod models;
mod output;
mod permissions;
mod provider;
mod session;
mod tokens;
mod tools;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so they never interleave with streamed answers.
///
/// `TETHER_LOG` wins over `RUST_LOG`; without either, only warnings show
/// (debug with `--verbose`).
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = std::env::var(constants::LOG_ENV_VAR)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    init_tracing(cli.verbose);
    cli::run(cli).await
}
