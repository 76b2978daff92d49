//! Struct definitions and serde defaults for tether configuration.

use crate::permissions::PermissionConfig;
use serde::{Deserialize, Serialize};

/// Root configuration for tether, deserialized from `config.toml`.
///
/// Fields use serde defaults so tether can run with sensible defaults
/// when no config file exists.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default model identifier (e.g. `"openai/gpt-4o-mini"`).
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Default provider name (e.g., "aipipe", "openai").
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Introduction paragraph of the agent preamble.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: Option<String>,
    /// Sampling temperature for completion requests.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Model requests allowed per user turn.
    #[serde(default)]
    pub max_iterations: Option<usize>,
    /// Deadline for one streamed completion, in seconds.
    #[serde(default)]
    pub stream_timeout_secs: Option<u64>,
    /// Deadline for one tool invocation, in seconds.
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
    /// Settings for the built-in tools.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Permission settings for tool execution.
    #[serde(default)]
    pub permissions: PermissionConfig,
}

/// Returns the default model identifier.
///
/// Used by serde's `#[serde(default)]` attribute during deserialization.
pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> Option<String> {
    Some(crate::constants::DEFAULT_SYSTEM_PROMPT.to_string())
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub aipipe: Option<ProviderEntry>,
    pub openai: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
    pub ollama: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
///
/// Allows overriding the API key, endpoint URL, and model on a
/// per-provider basis.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL for the provider's API (useful for proxies or self-hosted instances).
    pub base_url: Option<String>,
    /// Model identifier to use with this provider, overriding the global default.
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub javascript: JavascriptConfig,
}

/// `google_search` backend. Live results need both `api_key` and
/// `engine_id`; otherwise results are simulated.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
    pub max_results: Option<usize>,
}

/// Secondary completion used by `ai_pipe_proxy`. Unset fields fall back to
/// the session endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PipelineConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct JavascriptConfig {
    /// Runtime binary, looked up on the sandbox PATH.
    pub runtime: Option<String>,
    pub max_output_bytes: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            provider: ProviderConfig::default(),
            default_provider: None,
            system_prompt: default_system_prompt(),
            temperature: None,
            max_iterations: None,
            stream_timeout_secs: None,
            tool_timeout_secs: None,
            tools: ToolsConfig::default(),
            permissions: PermissionConfig::default(),
        }
    }
}
