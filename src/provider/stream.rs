//! Chat-completions SSE chunk accumulation.
//!
//! [`StreamAccumulator`] folds the `data:` payloads of an OpenAI-compatible
//! streaming response into the cumulative text seen so far, plus any native
//! tool calls the model emitted alongside it.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::tools::ToolCall;

/// Sentinel payload that ends an OpenAI-style stream.
pub const DONE_MARKER: &str = "[DONE]";

/// The terminal value of a successful stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Full text produced by the model.
    pub text: String,
    /// Tool calls the model issued through the native `tool_calls` channel.
    pub tool_calls: Vec<ToolCall>,
}

/// What one SSE payload changed.
#[derive(Debug, PartialEq)]
pub enum ChunkOutcome {
    /// New text was appended; carries the cumulative text.
    Text(String),
    /// Nothing user-visible changed (role preamble, tool-call fragment, keepalive).
    Idle,
    /// `[DONE]` arrived.
    Done,
}

// Endpoints send explicit `null` for absent members, so every container is
// an Option rather than a defaulted value.
#[derive(Deserialize)]
struct ChunkData {
    #[serde(default)]
    choices: Option<Vec<ChunkChoice>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Default)]
struct PartialToolCall {
    name: String,
    arguments: String,
}

#[derive(Default)]
pub struct StreamAccumulator {
    text: String,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    finish_reason: Option<String>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one SSE `data:` payload. An API error embedded in the stream,
    /// or a payload that is not JSON, ends the stream with `Err`.
    pub fn apply(&mut self, data: &str) -> Result<ChunkOutcome, String> {
        let data = data.trim();
        if data == DONE_MARKER {
            return Ok(ChunkOutcome::Done);
        }
        if data.is_empty() {
            return Ok(ChunkOutcome::Idle);
        }

        let chunk: ChunkData = serde_json::from_str(data)
            .map_err(|e| format!("malformed stream chunk ({e}): {data}"))?;
        if let Some(error) = chunk.error {
            return Err(api_error_message(&error));
        }

        let mut appended = false;
        for choice in chunk.choices.into_iter().flatten().take(1) {
            let (content, tool_calls) = match choice.delta {
                Some(delta) => (delta.content, delta.tool_calls),
                None => (None, None),
            };
            if let Some(content) = content {
                if !content.is_empty() {
                    self.text.push_str(&content);
                    appended = true;
                }
            }
            for delta in tool_calls.into_iter().flatten() {
                let entry = self.tool_calls.entry(delta.index).or_default();
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        entry.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        entry.arguments.push_str(&arguments);
                    }
                }
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason;
            }
        }

        Ok(if appended {
            ChunkOutcome::Text(self.text.clone())
        } else {
            ChunkOutcome::Idle
        })
    }

    /// Whether the model reported a finish reason before the stream closed.
    pub fn saw_finish(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Consumes the accumulator. Native tool-call arguments that are not a
    /// JSON object become an empty parameter map.
    pub fn finish(self) -> Completion {
        let tool_calls = self
            .tool_calls
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| {
                let parameters = serde_json::from_str::<Value>(&call.arguments)
                    .unwrap_or(Value::Null);
                ToolCall::new(call.name, parameters)
            })
            .collect();
        Completion {
            text: self.text,
            tool_calls,
        }
    }
}

fn api_error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .unwrap_or("An error occurred during streaming")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(content: &str) -> String {
        json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": content}}]
        })
        .to_string()
    }

    #[test]
    fn text_is_cumulative() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.apply(&chunk("{\"out")).unwrap(), ChunkOutcome::Text("{\"out".into()));
        assert_eq!(
            acc.apply(&chunk("put\": 1}")).unwrap(),
            ChunkOutcome::Text("{\"output\": 1}".into())
        );
        assert_eq!(acc.apply("[DONE]").unwrap(), ChunkOutcome::Done);
        assert_eq!(acc.finish().text, "{\"output\": 1}");
    }

    #[test]
    fn role_only_delta_is_idle() {
        let mut acc = StreamAccumulator::new();
        let data = json!({"choices": [{"delta": {"role": "assistant"}}]}).to_string();
        assert_eq!(acc.apply(&data).unwrap(), ChunkOutcome::Idle);
    }

    #[test]
    fn null_members_are_treated_as_absent() {
        let mut acc = StreamAccumulator::new();
        let text = json!({"choices": [{"delta": {"content": "Hi", "tool_calls": null}}]});
        assert_eq!(acc.apply(&text.to_string()).unwrap(), ChunkOutcome::Text("Hi".into()));

        let finish = json!({"choices": [{"delta": null, "finish_reason": "stop"}]});
        assert_eq!(acc.apply(&finish.to_string()).unwrap(), ChunkOutcome::Idle);
        assert!(acc.saw_finish());

        let usage_only = json!({"choices": null, "usage": {"total_tokens": 3}});
        assert_eq!(acc.apply(&usage_only.to_string()).unwrap(), ChunkOutcome::Idle);
        assert_eq!(acc.finish().text, "Hi");
    }

    #[test]
    fn embedded_error_fails_the_stream() {
        let mut acc = StreamAccumulator::new();
        let data = json!({"error": {"message": "rate limited"}}).to_string();
        assert_eq!(acc.apply(&data).unwrap_err(), "rate limited");
    }

    #[test]
    fn non_json_payload_fails_the_stream() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.apply("not json").is_err());
    }

    #[test]
    fn native_tool_call_fragments_are_joined() {
        let mut acc = StreamAccumulator::new();
        let first = json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "id": "call_1", "function": {"name": "google_search", "arguments": "{\"query\":"}}
        ]}}]});
        let second = json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": "\"rust\"}"}}
        ]}, "finish_reason": "tool_calls"}]});
        acc.apply(&first.to_string()).unwrap();
        acc.apply(&second.to_string()).unwrap();
        assert!(acc.saw_finish());

        let completion = acc.finish();
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "google_search");
        assert_eq!(completion.tool_calls[0].parameters["query"], "rust");
    }

    #[test]
    fn unparsable_native_arguments_become_empty_parameters() {
        let mut acc = StreamAccumulator::new();
        let data = json!({"choices": [{"delta": {"tool_calls": [
            {"index": 0, "function": {"name": "javascript_execution", "arguments": "{broken"}}
        ]}}]});
        acc.apply(&data.to_string()).unwrap();
        let completion = acc.finish();
        assert!(completion.tool_calls[0].parameters.is_empty());
    }
}
