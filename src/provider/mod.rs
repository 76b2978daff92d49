//! LLM provider layer for tether.
//!
//! Resolves which OpenAI-compatible endpoint to talk to (AI Pipe, OpenAI,
//! OpenRouter, or a local Ollama) and streams chat completions from it.
//! Everything above this module sees only [`CompletionBackend`] and the
//! [`StreamEvent`]s it yields.

mod client;
mod kind;
mod listing;
mod resolve;
mod stream;

pub use client::{
    CompletionBackend, CompletionRequest, CompletionStream, EndpointConfig, HttpCompletionClient,
    StreamEvent,
};
pub use kind::{default_model_for, ProviderKind};
pub use listing::list_models;
pub use resolve::{resolve_endpoint, resolve_model, ModelSelection};
pub use stream::Completion;
