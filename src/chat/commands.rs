//! Slash command handlers for the chat REPL.
//!
//! Dispatches `/history`, `/tools`, `/clear`, and `/help` commands.
//! Returns a [`CommandAction`] so the REPL loop can decide how to proceed.

use colored::Colorize;

use crate::agent::{Agent, AgentSession};
use crate::format;

/// Action returned by slash command handling.
pub(crate) enum CommandAction {
    /// Command was handled successfully; continue the REPL loop.
    Continue,
    /// Unknown command was entered.
    Unknown(String),
}

/// Dispatch and handle a slash command.
pub(crate) fn handle_slash_command(
    command: &str,
    session: &mut AgentSession,
    agent: &Agent,
    model_name: &str,
) -> CommandAction {
    match command {
        "/history" => {
            for msg in session.messages() {
                println!("{}", format::format_message(&msg));
                println!();
            }
            CommandAction::Continue
        }
        "/tools" => {
            for spec in agent.tools() {
                println!("  {} - {}", spec.name.cyan(), spec.description.dimmed());
            }
            CommandAction::Continue
        }
        "/clear" => {
            // The conversation is append-only, so clearing starts over
            *session = super::fresh_session(model_name);
            println!("{}", "Started a new session.".dimmed());
            CommandAction::Continue
        }
        "/help" => {
            println!("{}", "Commands:".bold());
            println!("  {} - show conversation history", "/history".cyan());
            println!("  {} - list the tools the agent can call", "/tools".cyan());
            println!("  {} - start a new, empty session", "/clear".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - exit", "Ctrl+D".cyan());
            CommandAction::Continue
        }
        _ => CommandAction::Unknown(command.to_string()),
    }
}
