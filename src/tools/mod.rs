//! Tool catalog and dispatch types.
//!
//! Every capability implements [`Tool`]; the [`ToolRegistry`] holds a fixed,
//! ordered catalog of them for the lifetime of a session, and the
//! [`ToolExecutor`] turns a model-issued [`ToolCall`] into a [`ToolResult`].

pub mod executor;
pub mod javascript;
pub mod pipeline;
pub mod sandbox;
pub mod schema;
pub mod search;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub use executor::ToolExecutor;
pub use schema::{ParamType, ParameterSchema};

use crate::config::Config;
use crate::provider::EndpointConfig;
use javascript::JavascriptTool;
use pipeline::PipelineTool;
use search::SearchTool;

/// Failures the executor folds into error results.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("Invalid parameters for '{tool}': {reason}")]
    InvalidToolParameters { tool: String, reason: String },
    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailure { tool: String, reason: String },
    #[error("Tool '{tool}' timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },
    #[error("Tool '{tool}' is disabled by configuration")]
    PermissionDenied { tool: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ToolRegistryError {
    #[error("a tool named '{0}' is already registered")]
    DuplicateTool(String),
}

/// Advertised description of a capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

impl ToolSpec {
    /// OpenAI-style function tool entry for the `tools` request field.
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters.to_json(),
            }
        })
    }
}

/// A tool invocation requested by the model.
///
/// Nothing guarantees `name` refers to a registered tool or that
/// `parameters` satisfy its schema; the executor checks both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            parameters: match parameters {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }
}

/// Exactly one of a payload or an error message.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Payload(Value),
    Error(String),
}

/// The result of executing a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_name: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, payload: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Payload(payload),
        }
    }

    pub fn error(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            outcome: ToolOutcome::Error(message.into()),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.outcome {
            ToolOutcome::Payload(v) => Some(v),
            ToolOutcome::Error(_) => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Payload(_) => None,
            ToolOutcome::Error(msg) => Some(msg),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }

    /// Text stored in the tool message: the pretty-printed payload, or
    /// `{"error": ...}` on failure.
    pub fn to_content(&self) -> String {
        let value = match &self.outcome {
            ToolOutcome::Payload(v) => v.clone(),
            ToolOutcome::Error(msg) => json!({ "error": msg }),
        };
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

/// Every capability implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// Parameters the tool accepts.
    fn schema(&self) -> ParameterSchema;

    /// Execute the tool with parameters already checked against [`Tool::schema`].
    async fn execute(&self, input: Map<String, Value>) -> Result<Value>;
}

/// Holds all registered tools in registration order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            specs: Vec::new(),
        }
    }

    /// Register a tool. Called during startup; names must be unique.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolRegistryError> {
        if self.specs.iter().any(|s| s.name == tool.name()) {
            return Err(ToolRegistryError::DuplicateTool(tool.name().to_string()));
        }
        self.specs.push(ToolSpec {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.schema(),
        });
        self.tools.push(Arc::from(tool));
        Ok(())
    }

    /// The catalog, in the stable order it is advertised to the model.
    pub fn list(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolSpec, ToolError> {
        self.specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: name.to_string(),
            })
    }

    pub(crate) fn capability(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a registry with the three built-in capabilities.
    ///
    /// `endpoint` is the session's completion endpoint, reused by
    /// `ai_pipe_proxy` unless `[tools.pipeline]` points elsewhere.
    pub fn with_builtins(config: &Config, endpoint: Option<&EndpointConfig>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(SearchTool::from_config(&config.tools.search)))?;
        registry.register(Box::new(PipelineTool::from_config(
            &config.tools.pipeline,
            endpoint,
        )))?;
        registry.register(Box::new(JavascriptTool::from_config(
            &config.tools.javascript,
            config.tool_timeout(),
        )))?;
        Ok(registry)
    }
}
