//! Interactive chat REPL for tether.
//!
//! Provides a multi-turn conversation loop using [`rustyline`] for readline
//! support (history, line editing). Each line is one user turn through the
//! [`Agent`]; the session's conversation carries context across turns and is
//! mirrored to a transcript on disk.

mod commands;
mod context;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use crate::agent::{Agent, AgentError, AgentSession};
use crate::cli::build_agent;
use crate::config::Config;
use crate::format;
use crate::output::StdoutRenderer;
use crate::provider::ModelSelection;
use crate::session::Transcript;

/// Starts a fresh recorded session, or an unrecorded one if the sessions
/// directory is unusable.
pub(crate) fn fresh_session(model: &str) -> AgentSession {
    match Transcript::create(model) {
        Ok(transcript) => AgentSession::recorded(transcript, Vec::new()),
        Err(e) => {
            warn!(error = %e, "transcript unavailable, session will not be saved");
            AgentSession::new()
        }
    }
}

fn short_id(session: &AgentSession) -> String {
    session
        .transcript_id()
        .map(|id| id.chars().take(8).collect())
        .unwrap_or_else(|| "unsaved".to_string())
}

/// Runs the interactive chat REPL.
///
/// # Readline behavior
///
/// - **Ctrl+C**: cancels current input, stays in REPL
/// - **Ctrl+D**: exits cleanly with "goodbye."
/// - Readline history is persisted to `~/.cache/tether/chat_history.txt`
pub async fn run_chat(
    config: Config,
    session_id: Option<String>,
    selection: &ModelSelection,
) -> Result<()> {
    let agent = build_agent(&config, selection)?;
    let model_name = selection.model.clone();

    let mut session = if let Some(ref id) = session_id {
        let (transcript, history) = Transcript::open(id)?;
        let session = AgentSession::recorded(transcript, history);
        println!(
            "{} [session: {}] [model: {}]",
            "resuming".bold().cyan(),
            short_id(&session).yellow(),
            model_name.yellow(),
        );
        println!();
        for msg in session.messages() {
            println!("{}", format::format_message(&msg));
            println!();
        }
        session
    } else {
        let session = fresh_session(&model_name);
        println!(
            "{} [session: {}] [model: {}] (Ctrl+D to exit)",
            "tether chat".bold().cyan(),
            short_id(&session).yellow(),
            model_name.yellow(),
        );
        println!();
        session
    };

    if agent.endpoint().is_none() {
        println!(
            "{} no API key for {}; set {}_API_KEY or [provider.{}] api_key",
            "warning:".yellow().bold(),
            selection.provider.display_name(),
            selection.provider.key().to_uppercase(),
            selection.provider.key(),
        );
        println!();
    }

    // Set up readline with persistent history
    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        let readline = rl.readline(&format!("{} ", ">".green().bold()));

        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }

                if line.starts_with('/') {
                    match commands::handle_slash_command(&line, &mut session, &agent, &model_name)
                    {
                        commands::CommandAction::Continue => continue,
                        commands::CommandAction::Unknown(cmd) => {
                            println!("{} Unknown command: {}", "?".yellow(), cmd);
                            continue;
                        }
                    }
                }

                let _ = rl.add_history_entry(&line);
                println!();

                run_turn(&agent, &session, &line, &model_name).await?;
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Runs one user turn and reports context usage afterwards.
///
/// Agent errors were already shown by the renderer; they end the turn, not
/// the REPL.
async fn run_turn(agent: &Agent, session: &AgentSession, line: &str, model: &str) -> Result<()> {
    let mut renderer = StdoutRenderer::new();
    match agent.submit_user_message(session, line, &mut renderer).await {
        Ok(outcome) => {
            debug!(rounds = outcome.rounds, tool_calls = outcome.tool_calls, "chat turn done");
        }
        Err(AgentError::ConfigurationMissing(_)) => return Ok(()),
        Err(_) => {}
    }
    context::report_usage(session, agent, model)
}
