//! Context usage display for the chat REPL.

use anyhow::Result;
use colored::Colorize;

use crate::agent::{Agent, AgentSession};
use crate::tokens::{self, ContextStatus};

/// Prints the token count of the next request against the model's context
/// window, colour-coded by how full it is.
pub(crate) fn report_usage(session: &AgentSession, agent: &Agent, model: &str) -> Result<()> {
    let used = tokens::count_conversation_tokens(&session.flatten(agent.preamble()), model)?;

    match tokens::check_context_usage(used, model) {
        ContextStatus::Ok { used, limit } => {
            println!(
                "{}",
                format!("Tokens: {}", tokens::format_token_usage(used, limit)).dimmed()
            );
        }
        ContextStatus::Warning {
            used,
            limit,
            percent,
        } => {
            println!(
                "{}",
                format!(
                    "Tokens: {} ({}%) -- consider /clear",
                    tokens::format_token_usage(used, limit),
                    percent,
                )
                .yellow()
            );
        }
        ContextStatus::Critical {
            used,
            limit,
            percent,
        } => {
            println!(
                "{}",
                format!(
                    "Tokens: {} ({}%) -- context nearly full, start a new session with /clear",
                    tokens::format_token_usage(used, limit),
                    percent,
                )
                .red()
            );
        }
    }
    Ok(())
}
