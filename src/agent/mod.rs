//! The orchestration loop.
//!
//! [`Agent::submit_user_message`] drives one user turn through the state
//! machine `Requesting -> (ToolDispatch -> Requesting)* -> Done`:
//!
//! 1. The flattened conversation and the tool catalog go to the
//!    [`CompletionBackend`]; partial text is forwarded to the renderer.
//! 2. The finished text is parsed as an [`AgentDirective`] (plain text falls
//!    back to a final answer). Its `output` becomes an assistant message.
//! 3. Requested tool calls run concurrently; one tool message per call is
//!    appended in call order, then the model is asked again.
//!
//! A stream failure or timeout abandons the round without appending
//! anything for it. Tool failures never end a turn.

mod directive;
mod error;
mod prompt;
mod session;
mod state;

#[cfg(test)]
mod tests;

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use directive::AgentDirective;
pub use error::AgentError;
pub use session::AgentSession;
pub use state::LoopState;

use crate::config::Config;
use crate::constants::{DEFAULT_SYSTEM_PROMPT, MAX_AGENT_ITERATIONS, STREAM_TIMEOUT_SECS};
use crate::message::Message;
use crate::output::Renderer;
use crate::provider::{
    Completion, CompletionBackend, CompletionRequest, EndpointConfig, StreamEvent,
};
use crate::tools::{ToolExecutor, ToolSpec};

/// Loop limits and the preamble intro.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model requests allowed per user turn.
    pub max_iterations: usize,
    /// Deadline for one streamed completion, start to finish.
    pub stream_timeout: Duration,
    pub system_prompt: String,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.max_iterations(),
            stream_timeout: config.stream_timeout(),
            system_prompt: config
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: MAX_AGENT_ITERATIONS,
            stream_timeout: Duration::from_secs(STREAM_TIMEOUT_SECS),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Summary of a finished turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Model requests made.
    pub rounds: usize,
    /// Tool calls dispatched across all rounds.
    pub tool_calls: usize,
    /// The last assistant output of the turn, if any.
    pub final_output: Option<String>,
}

pub struct Agent {
    backend: Arc<dyn CompletionBackend>,
    executor: ToolExecutor,
    endpoint: Option<EndpointConfig>,
    settings: AgentSettings,
    preamble: String,
}

impl Agent {
    /// `endpoint` may be `None`; every submission then fails with
    /// [`AgentError::ConfigurationMissing`].
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        executor: ToolExecutor,
        endpoint: Option<EndpointConfig>,
        settings: AgentSettings,
    ) -> Self {
        let preamble = prompt::build_preamble(&settings.system_prompt, executor.registry().list());
        Self {
            backend,
            executor,
            endpoint,
            settings,
            preamble,
        }
    }

    pub fn endpoint(&self) -> Option<&EndpointConfig> {
        self.endpoint.as_ref()
    }

    pub fn tools(&self) -> &[ToolSpec] {
        self.executor.registry().list()
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Runs one user turn to completion.
    ///
    /// Rejected with [`AgentError::Busy`] while another turn is running on
    /// the same session; the rejected text is dropped, not queued.
    pub async fn submit_user_message(
        &self,
        session: &AgentSession,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            AgentError::ConfigurationMissing(
                "set a provider API key or choose a provider with --provider".to_string(),
            )
        })?;
        let _guard = session.begin()?;

        session.commit(vec![Message::user(text)]);
        let result = self.run(session, endpoint, renderer).await;
        match &result {
            Ok(outcome) => {
                info!(rounds = outcome.rounds, tool_calls = outcome.tool_calls, "turn finished");
                renderer.render_done();
            }
            Err(e) => {
                warn!(error = %e, "turn aborted");
                renderer.render_error(&e.to_string());
            }
        }
        result
    }

    async fn run(
        &self,
        session: &AgentSession,
        endpoint: &EndpointConfig,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome, AgentError> {
        let mut outcome = TurnOutcome {
            rounds: 0,
            tool_calls: 0,
            final_output: None,
        };
        let mut state = LoopState::Requesting(1);

        loop {
            debug!(%state, "agent state");
            state = match state {
                LoopState::Requesting(round) => {
                    if round > self.settings.max_iterations {
                        return Err(AgentError::MaxIterationsExceeded(self.settings.max_iterations));
                    }
                    outcome.rounds = round;

                    let completion = self.request(session, endpoint, renderer).await?;
                    let directive =
                        AgentDirective::parse(&completion.text).with_native_calls(completion.tool_calls);

                    let next = if directive.is_final() {
                        LoopState::Done
                    } else {
                        LoopState::ToolDispatch(directive.calls().to_vec())
                    };
                    if let Some(output) = directive.output {
                        let msg = Message::assistant(output.clone());
                        renderer.render_message(&msg);
                        session.commit(vec![msg]);
                        outcome.final_output = Some(output);
                    }
                    next
                }
                LoopState::ToolDispatch(calls) => {
                    let results = self.executor.execute_all(&calls).await;
                    outcome.tool_calls += results.len();

                    let messages: Vec<Message> = results
                        .iter()
                        .map(|r| Message::tool(&r.tool_name, r.to_content()))
                        .collect();
                    for msg in &messages {
                        renderer.render_message(msg);
                    }
                    session.commit(messages);
                    LoopState::Requesting(outcome.rounds + 1)
                }
                LoopState::Done => return Ok(outcome),
            };
        }
    }

    /// Consumes one completion stream under the stream deadline.
    async fn request(
        &self,
        session: &AgentSession,
        endpoint: &EndpointConfig,
        renderer: &mut dyn Renderer,
    ) -> Result<Completion, AgentError> {
        let request = CompletionRequest {
            messages: session.flatten(&self.preamble),
            tools: self.tools().to_vec(),
            endpoint: endpoint.clone(),
        };
        let mut stream = self.backend.complete(request);
        let deadline = tokio::time::Instant::now() + self.settings.stream_timeout;
        let mut latest = String::new();

        let result = loop {
            match tokio::time::timeout_at(deadline, stream.next()).await {
                Err(_) => {
                    break Err(AgentError::StreamFailure(format!(
                        "no complete response within {}s",
                        self.settings.stream_timeout.as_secs()
                    )))
                }
                Ok(Some(StreamEvent::Partial(text))) => {
                    renderer.render_partial(&text);
                    latest = text;
                }
                Ok(Some(StreamEvent::Completed(completion))) => break Ok(completion),
                Ok(Some(StreamEvent::Failed(message))) => break Err(AgentError::StreamFailure(message)),
                // A backend that ends without a terminal event delivered
                // everything it had.
                Ok(None) => {
                    break Ok(Completion {
                        text: latest,
                        tool_calls: Vec::new(),
                    })
                }
            }
        };
        renderer.end_stream();
        result
    }
}
