//! Centralized model registry for tether.
//!
//! Defines known models with their context window sizes. Both
//! `provider::listing` (for `tether models`) and `tokens.rs` (for context
//! window lookup) consume from here.

use crate::provider::ProviderKind;

/// Information about a known LLM model.
pub struct ModelInfo {
    /// The model identifier string as the provider expects it.
    pub name: &'static str,
    /// Context window size in tokens.
    pub context_window: usize,
}

/// OpenRouter-style identifiers, served by both AI Pipe and OpenRouter.
pub const OPENROUTER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "openai/gpt-4o-mini",
        context_window: 128_000,
    },
    ModelInfo {
        name: "openai/gpt-4o",
        context_window: 128_000,
    },
    ModelInfo {
        name: "openai/gpt-4.1-nano",
        context_window: 1_047_576,
    },
    ModelInfo {
        name: "anthropic/claude-3.5-sonnet",
        context_window: 200_000,
    },
    ModelInfo {
        name: "google/gemini-2.0-flash-001",
        context_window: 1_048_576,
    },
    ModelInfo {
        name: "meta-llama/llama-3.1-70b-instruct",
        context_window: 131_072,
    },
];

/// Known OpenAI models.
pub const OPENAI_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "gpt-4o-mini",
        context_window: 128_000,
    },
    ModelInfo {
        name: "gpt-4o",
        context_window: 128_000,
    },
    ModelInfo {
        name: "gpt-4.1",
        context_window: 1_047_576,
    },
    ModelInfo {
        name: "gpt-4.1-mini",
        context_window: 1_047_576,
    },
    ModelInfo {
        name: "o4-mini",
        context_window: 200_000,
    },
];

/// Common Ollama models with known context window sizes.
/// Ollama models are also queried dynamically; these provide context window
/// defaults for models we recognize.
pub const OLLAMA_MODELS: &[ModelInfo] = &[
    ModelInfo {
        name: "llama3",
        context_window: 8_192,
    },
    ModelInfo {
        name: "llama3.1",
        context_window: 131_072,
    },
    ModelInfo {
        name: "mistral",
        context_window: 32_768,
    },
    ModelInfo {
        name: "qwen2.5",
        context_window: 32_768,
    },
];

/// Static catalog for a provider. Ollama's is only a fallback for its live
/// listing.
pub fn catalog(provider: ProviderKind) -> &'static [ModelInfo] {
    match provider {
        ProviderKind::AiPipe | ProviderKind::OpenRouter => OPENROUTER_MODELS,
        ProviderKind::OpenAI => OPENAI_MODELS,
        ProviderKind::Ollama => OLLAMA_MODELS,
    }
}

/// Every known model across providers.
pub fn all() -> impl Iterator<Item = &'static ModelInfo> {
    OPENROUTER_MODELS
        .iter()
        .chain(OPENAI_MODELS.iter())
        .chain(OLLAMA_MODELS.iter())
}
