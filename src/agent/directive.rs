//! The model's structured reply.
//!
//! Replies are untrusted text. [`AgentDirective::parse`] accepts only the
//! `{"output": ..., "tool_calls": [...]}` object shape and degrades anything
//! else to a plain-text answer, so every round terminates.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::tools::ToolCall;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentDirective {
    /// Text meant for the user. Never `Some("")`.
    pub output: Option<String>,
    /// Never `Some(vec![])`: an empty list means "final answer".
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Error, PartialEq)]
pub enum DirectiveError {
    #[error("reply is not a directive: {0}")]
    MalformedDirective(String),
}

#[derive(Deserialize)]
struct WireDirective {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    name: String,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
}

/// Drops a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`, etc.)
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

impl AgentDirective {
    /// Parses a reply, falling back to `{output: text}` when it is not a
    /// well-formed directive. Never fails.
    pub fn parse(text: &str) -> Self {
        match Self::parse_strict(text) {
            Ok(directive) => directive,
            Err(e) => {
                if !text.trim().is_empty() {
                    warn!(error = %e, "treating reply as plain text");
                }
                Self::plain(text)
            }
        }
    }

    pub fn parse_strict(text: &str) -> Result<Self, DirectiveError> {
        let body = strip_code_fence(text);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| DirectiveError::MalformedDirective(e.to_string()))?;

        let is_directive = value
            .as_object()
            .is_some_and(|obj| obj.contains_key("output") || obj.contains_key("tool_calls"));
        if !is_directive {
            return Err(DirectiveError::MalformedDirective(
                "expected an object with `output` or `tool_calls`".to_string(),
            ));
        }

        let wire: WireDirective = serde_json::from_value(value)
            .map_err(|e| DirectiveError::MalformedDirective(e.to_string()))?;
        let tool_calls: Vec<ToolCall> = wire
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                name: call.name,
                parameters: call.parameters.unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            output: wire.output.filter(|o| !o.trim().is_empty()),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        })
    }

    /// The raw text as a final answer.
    pub fn plain(text: &str) -> Self {
        Self {
            output: (!text.trim().is_empty()).then(|| text.to_string()),
            tool_calls: None,
        }
    }

    /// Adopts calls sent over the native `tool_calls` channel when the text
    /// itself asked for none.
    pub fn with_native_calls(mut self, native: Vec<ToolCall>) -> Self {
        if self.tool_calls.is_none() && !native.is_empty() {
            self.tool_calls = Some(native);
        }
        self
    }

    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn is_final(&self) -> bool {
        self.calls().is_empty()
    }
}
