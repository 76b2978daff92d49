//! Provider kind enumeration and per-provider defaults.
//!
//! Defines [`ProviderKind`] which identifies which OpenAI-compatible backend
//! to talk to, along with its base URL, credential policy and default model.

use anyhow::{anyhow, Result};

/// Identifies which LLM provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// AI Pipe (OpenRouter proxy authenticated with an AI Pipe token).
    AiPipe,
    /// OpenAI (chat completions API).
    OpenAI,
    /// OpenRouter (multi-provider gateway).
    OpenRouter,
    /// Ollama (local models via its OpenAI-compatible API).
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::AiPipe,
        ProviderKind::OpenAI,
        ProviderKind::OpenRouter,
        ProviderKind::Ollama,
    ];

    /// Parses a provider name string into a [`ProviderKind`].
    ///
    /// Matching is case-insensitive. Returns an error for unknown providers.
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aipipe" | "ai-pipe" => Ok(Self::AiPipe),
            "openai" => Ok(Self::OpenAI),
            "openrouter" => Ok(Self::OpenRouter),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!(
                "Unknown provider: {other}. Supported: aipipe, openai, openrouter, ollama"
            )),
        }
    }

    /// Config key and env-var stem (`<NAME>_API_KEY`).
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::AiPipe => "aipipe",
            ProviderKind::OpenAI => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::AiPipe => "AI Pipe",
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::Ollama => "Ollama (Local)",
        }
    }

    /// Whether a bearer credential must be present before any request.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }

    /// Base URL of the OpenAI-compatible API, including the `/v1` segment.
    pub fn default_base_url(&self) -> String {
        match self {
            ProviderKind::AiPipe => crate::constants::AIPIPE_BASE_URL.to_string(),
            ProviderKind::OpenAI => crate::constants::OPENAI_BASE_URL.to_string(),
            ProviderKind::OpenRouter => crate::constants::OPENROUTER_BASE_URL.to_string(),
            ProviderKind::Ollama => format!("{}/v1", crate::constants::OLLAMA_DEFAULT_BASE_URL),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Returns the default model identifier for a given provider.
pub fn default_model_for(provider: &ProviderKind) -> &'static str {
    match provider {
        ProviderKind::AiPipe => crate::constants::DEFAULT_MODEL,
        ProviderKind::OpenAI => crate::constants::DEFAULT_OPENAI_MODEL,
        ProviderKind::OpenRouter => crate::constants::DEFAULT_OPENROUTER_MODEL,
        ProviderKind::Ollama => crate::constants::OLLAMA_DEFAULT_MODEL,
    }
}
