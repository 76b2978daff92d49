//! Centralized constants for tether.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "tether";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "tether.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV_VAR: &str = "TETHER_LOG";

// --- Provider defaults ---

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "aipipe";

/// Default model identifier (OpenRouter-style, served by AI Pipe).
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default model identifier for OpenAI.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

/// Default model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// AI Pipe's OpenRouter-compatible endpoint.
pub const AIPIPE_BASE_URL: &str = "https://aipipe.org/openrouter/v1";

/// OpenAI's API endpoint.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenRouter's API endpoint.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default base URL for a local Ollama server (without the `/v1` suffix).
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

// --- Orchestration defaults ---

/// Sampling temperature sent with every completion request.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Maximum model requests per user turn before the loop gives up.
pub const MAX_AGENT_ITERATIONS: usize = 10;

/// Wall-clock budget for one streamed completion, in seconds.
pub const STREAM_TIMEOUT_SECS: u64 = 120;

/// Wall-clock budget for one tool invocation, in seconds.
pub const TOOL_TIMEOUT_SECS: u64 = 30;

/// Introduction paragraph of the agent preamble.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an intelligent agent that can use tools to help answer questions and solve problems.";

// --- Context window ---

/// Default context window size for models not in the registry.
pub const DEFAULT_CONTEXT_WINDOW: usize = 8_192;

/// Context usage ratio at which a warning is shown (80%).
pub const CONTEXT_WARN_THRESHOLD: f64 = 0.80;

/// Context usage ratio at which usage is shown as critical (95%).
pub const CONTEXT_DANGER_THRESHOLD: f64 = 0.95;

// --- Token counting ---

/// Approximate token overhead per message (role markers, etc.).
pub const TOKENS_PER_MESSAGE_OVERHEAD: usize = 4;

/// Approximate token overhead for conversation framing.
pub const TOKENS_CONVERSATION_FRAMING: usize = 2;

// --- Tool limits ---

/// Results returned by `google_search` when the caller does not ask.
pub const SEARCH_DEFAULT_RESULTS: usize = 5;

/// Upper bound on `num_results` accepted by `google_search`.
pub const SEARCH_MAX_RESULTS: usize = 10;

/// Results the simulated search backend will ever produce.
pub const SEARCH_SIMULATED_MAX: usize = 5;

/// Google Custom Search JSON API endpoint.
pub const GOOGLE_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Model used by `ai_pipe_proxy` for its secondary completion.
pub const PIPELINE_DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// JavaScript runtime binary used by `javascript_execution`.
pub const JS_DEFAULT_RUNTIME: &str = "node";

/// Node flag that turns on its permission model (no fs, child processes,
/// workers or addons unless granted). Requires Node 22.13 or newer.
pub const JS_PERMISSION_FLAG: &str = "--permission";

/// Maximum bytes of sandbox output kept before truncation.
pub const SANDBOX_MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// PATH handed to sandboxed processes after the environment is cleared.
pub const SANDBOX_PATH: &str = "/usr/local/bin:/usr/bin:/bin";
