//! Completion endpoint client.
//!
//! [`CompletionBackend`] is the seam the orchestration loop talks through.
//! [`HttpCompletionClient`] implements it against any OpenAI-compatible
//! `/chat/completions` endpoint (AI Pipe, OpenAI, OpenRouter, Ollama),
//! consuming the streamed response as server-sent events.

use anyhow::{Context, Result};
use eventsource_stream::{Event, Eventsource};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, error};

use super::stream::{ChunkOutcome, Completion, StreamAccumulator};
use crate::message::ChatMessage;
use crate::tools::ToolSpec;

/// Where and how to reach the model. Supplied by configuration and opaque
/// to everything except this module.
#[derive(Clone, PartialEq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl EndpointConfig {
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// One round's request: the flattened conversation plus the tool catalog.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub endpoint: EndpointConfig,
}

/// Streamed progress of one completion.
///
/// `Partial` always carries the full text so far, never a delta. A stream
/// ends with exactly one `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Partial(String),
    Completed(Completion),
    Failed(String),
}

pub type CompletionStream = BoxStream<'static, StreamEvent>;

pub trait CompletionBackend: Send + Sync {
    /// Issues one request. Transport and API failures arrive as a
    /// [`StreamEvent::Failed`] item rather than an `Err`.
    fn complete(&self, request: CompletionRequest) -> CompletionStream;
}

/// Streams chat completions over HTTP.
#[derive(Clone, Default)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends a non-streaming prompt and returns the whole reply.
    ///
    /// Used for secondary model calls such as the `ai_pipe_proxy` tool.
    pub async fn prompt(&self, endpoint: &EndpointConfig, prompt_text: &str) -> Result<String> {
        let body = json!({
            "model": endpoint.model,
            "messages": [{ "role": "user", "content": prompt_text }],
        });
        let mut builder = self.http.post(endpoint.completions_url()).json(&body);
        if !endpoint.api_key.is_empty() {
            builder = builder.bearer_auth(&endpoint.api_key);
        }
        let reply: Value = builder
            .send()
            .await
            .context("completion request failed")?
            .error_for_status()
            .context("completion endpoint returned an error status")?
            .json()
            .await
            .context("completion endpoint returned malformed JSON")?;

        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .context("completion reply has no message content")
    }
}

impl CompletionBackend for HttpCompletionClient {
    fn complete(&self, request: CompletionRequest) -> CompletionStream {
        let http = self.http.clone();
        stream::once(async move { open_stream(&http, &request).await })
            .flat_map(|opened| match opened {
                Ok(response) => sse_events(response.bytes_stream().eventsource().boxed()),
                Err(message) => {
                    error!(error = %message, "completion request rejected");
                    stream::iter([StreamEvent::Failed(message)]).boxed()
                }
            })
            .boxed()
    }
}

fn request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "model": request.endpoint.model,
        "messages": request.messages,
        "stream": true,
        "temperature": request.endpoint.temperature,
    });
    if !request.tools.is_empty() {
        body["tools"] = Value::Array(request.tools.iter().map(ToolSpec::to_wire).collect());
        body["tool_choice"] = json!("auto");
    }
    body
}

async fn open_stream(
    http: &reqwest::Client,
    request: &CompletionRequest,
) -> Result<reqwest::Response, String> {
    let url = request.endpoint.completions_url();
    debug!(%url, model = %request.endpoint.model, messages = request.messages.len(), "opening completion stream");

    let mut builder = http.post(&url).json(&request_body(request));
    if !request.endpoint.api_key.is_empty() {
        builder = builder.bearer_auth(&request.endpoint.api_key);
    }
    let response = builder
        .send()
        .await
        .map_err(|e| format!("request to {url} failed: {e}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or_else(|| body.trim().to_string());
        return Err(format!("completion endpoint returned {status}: {detail}"));
    }
    Ok(response)
}

struct SseState<S> {
    events: S,
    acc: StreamAccumulator,
    finished: bool,
}

/// Turns a parsed SSE stream into cumulative [`StreamEvent`]s.
fn sse_events<S, E>(events: S) -> CompletionStream
where
    S: Stream<Item = Result<Event, E>> + Send + Unpin + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = SseState {
        events,
        acc: StreamAccumulator::new(),
        finished: false,
    };
    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            let event = match state.events.next().await {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((StreamEvent::Failed(format!("SSE stream error: {e}")), state));
                }
                None => {
                    state.finished = true;
                    let terminal = if state.acc.saw_finish() {
                        StreamEvent::Completed(std::mem::take(&mut state.acc).finish())
                    } else {
                        StreamEvent::Failed("stream closed before the response completed".to_string())
                    };
                    return Some((terminal, state));
                }
            };

            match state.acc.apply(&event.data) {
                Ok(ChunkOutcome::Text(text)) => return Some((StreamEvent::Partial(text), state)),
                Ok(ChunkOutcome::Idle) => continue,
                Ok(ChunkOutcome::Done) => {
                    state.finished = true;
                    let completion = std::mem::take(&mut state.acc).finish();
                    return Some((StreamEvent::Completed(completion), state));
                }
                Err(message) => {
                    error!(error = %message, "completion stream failed");
                    state.finished = true;
                    return Some((StreamEvent::Failed(message), state));
                }
            }
        }
    })
    .boxed()
}
