//! Command-line interface definition and dispatch for tether.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; session operations live in the [`session`] submodule.

mod session;

use crate::agent::{Agent, AgentSession, AgentSettings};
use crate::config::Config;
use crate::output::StdoutRenderer;
use crate::permissions::PermissionManager;
use crate::provider::{self, HttpCompletionClient, ModelSelection};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::{chat, tokens};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tracing::warn;

/// Top-level CLI structure for tether.
#[derive(Parser)]
#[command(name = "tether", about = "A tool-using LLM agent for the terminal")]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the tether CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Ask a one-shot question
    Ask {
        /// The question to ask
        prompt: Vec<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
        /// Provider to use (aipipe, openai, openrouter, ollama)
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Start an interactive chat session
    Chat {
        /// Resume a specific session
        #[arg(short, long)]
        session: Option<String>,
        /// Provider to use (aipipe, openai, openrouter, ollama)
        #[arg(long)]
        provider: Option<String>,
        /// Model to use (overrides config)
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List the tools the agent can call
    Tools,
    /// List available models
    Models,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage chat sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the merged config with API keys redacted
    Show,
}

/// Subcommands for the `session` command.
#[derive(Subcommand)]
pub enum SessionAction {
    /// List all sessions
    List,
    /// Print a session's transcript (supports partial IDs)
    Show { id: String },
    /// Delete a session by ID (supports partial IDs)
    Delete { id: String },
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Wires the configured endpoint, tools and permissions into an [`Agent`].
///
/// A provider that cannot be resolved (usually a missing API key) is logged
/// and left out; the agent then reports `ConfigurationMissing` on the first
/// message instead of failing here.
pub(crate) fn build_agent(config: &Config, selection: &ModelSelection) -> Result<Agent> {
    let endpoint = match provider::resolve_endpoint(config, selection) {
        Ok(endpoint) => Some(endpoint),
        Err(e) => {
            warn!(provider = %selection.provider, error = %e, "no usable endpoint");
            None
        }
    };

    let registry = ToolRegistry::with_builtins(config, endpoint.as_ref())?;
    let executor = ToolExecutor::new(
        Arc::new(registry),
        PermissionManager::new(config.permissions.clone()),
        config.tool_timeout(),
    );

    Ok(Agent::new(
        Arc::new(HttpCompletionClient::new()),
        executor,
        endpoint,
        AgentSettings::from_config(config),
    ))
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            prompt,
            model,
            provider: provider_name,
        } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: tether ask \"your question here\"");
            }

            let config = Config::load()?;
            let selection =
                provider::resolve_model(provider_name.as_deref(), model.as_deref(), &config)?;
            let agent = build_agent(&config, &selection)?;

            println!(
                "{} [{}: {}]",
                "tether".bold().cyan(),
                selection.provider.key(),
                selection.model.yellow(),
            );
            println!();
            println!("{} {}", ">".green().bold(), prompt);
            println!();

            let session = AgentSession::new();
            let mut renderer = StdoutRenderer::new();
            let outcome = match agent.submit_user_message(&session, &prompt, &mut renderer).await {
                Ok(outcome) => outcome,
                // Already shown by the renderer
                Err(_) => std::process::exit(1),
            };

            let used = tokens::count_conversation_tokens(
                &session.flatten(agent.preamble()),
                &selection.model,
            )?;
            let limit = tokens::context_window_size(&selection.model);
            println!(
                "{}",
                format!(
                    "Tokens: {} | rounds: {} | tool calls: {}",
                    tokens::format_token_usage(used, limit),
                    outcome.rounds,
                    outcome.tool_calls,
                )
                .dimmed()
            );
            Ok(())
        }
        Commands::Chat {
            session: partial_id,
            provider: provider_name,
            model,
        } => {
            let config = Config::load()?;
            let selection =
                provider::resolve_model(provider_name.as_deref(), model.as_deref(), &config)?;
            let session_id = partial_id
                .as_deref()
                .map(session::resolve_session_id)
                .transpose()?;
            chat::run_chat(config, session_id, &selection).await
        }
        Commands::Tools => {
            let config = Config::load()?;
            let registry = ToolRegistry::with_builtins(&config, None)?;
            for spec in registry.list() {
                println!("{}", spec.name.bold().cyan());
                println!("  {}", spec.description);
                let required = spec.parameters.required_names();
                for (name, prop) in spec.parameters.properties() {
                    let marker = if required.contains(name) {
                        "required".yellow()
                    } else {
                        "optional".dimmed()
                    };
                    println!(
                        "    {} ({}, {}) {}",
                        name.green(),
                        prop.kind,
                        marker,
                        prop.description.dimmed()
                    );
                }
                println!();
            }
            Ok(())
        }
        Commands::Models => {
            let config = Config::load()?;
            provider::list_models(&config).await
        }
        Commands::Config { action } => {
            let config = Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let toml_str = toml::to_string_pretty(&config.redacted())?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
        Commands::Session { action } => session::handle_session(action),
    }
}
