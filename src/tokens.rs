//! Token counting for tether.
//!
//! Uses tiktoken-rs for BPE tokenization. For OpenAI models the exact
//! tokenizer is used; for everything else cl100k_base (GPT-4 family) serves
//! as a reasonable approximation.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::LazyLock;
use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use crate::constants::{
    CONTEXT_DANGER_THRESHOLD, CONTEXT_WARN_THRESHOLD, DEFAULT_CONTEXT_WINDOW,
    TOKENS_CONVERSATION_FRAMING, TOKENS_PER_MESSAGE_OVERHEAD,
};
use crate::message::ChatMessage;

/// OpenRouter-style ids (`openai/gpt-4o`) are looked up by their last segment.
fn bare_model(model: &str) -> &str {
    model.rsplit_once('/').map_or(model, |(_, name)| name)
}

fn tokenizer(model: &str) -> Result<CoreBPE> {
    get_bpe_from_model(bare_model(model)).or_else(|_| tiktoken_rs::cl100k_base())
}

/// Count tokens for a text string using the appropriate tokenizer for the model.
pub fn count_tokens(text: &str, model: &str) -> Result<usize> {
    Ok(tokenizer(model)?.encode_ordinary(text).len())
}

/// Count tokens across a flattened request.
/// Each message carries a few tokens of overhead for role markers.
pub fn count_conversation_tokens(messages: &[ChatMessage], model: &str) -> Result<usize> {
    let bpe = tokenizer(model)?;
    let total = messages
        .iter()
        .map(|m| TOKENS_PER_MESSAGE_OVERHEAD + bpe.encode_ordinary(&m.content).len())
        .sum::<usize>();
    Ok(total + TOKENS_CONVERSATION_FRAMING)
}

/// Format a token count for display. Example: "1,234 / 128,000"
pub fn format_token_usage(used: usize, limit: usize) -> String {
    format!("{} / {}", format_number(used), format_number(limit))
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

static CONTEXT_WINDOWS: LazyLock<HashMap<&'static str, usize>> = LazyLock::new(|| {
    crate::models::all()
        .map(|info| (info.name, info.context_window))
        .collect()
});

pub fn context_window_size(model: &str) -> usize {
    CONTEXT_WINDOWS
        .get(model)
        .or_else(|| CONTEXT_WINDOWS.get(bare_model(model)))
        .copied()
        .unwrap_or(DEFAULT_CONTEXT_WINDOW)
}

pub enum ContextStatus {
    Ok { used: usize, limit: usize },
    Warning { used: usize, limit: usize, percent: u8 },
    Critical { used: usize, limit: usize, percent: u8 },
}

pub fn check_context_usage(used: usize, model: &str) -> ContextStatus {
    let limit = context_window_size(model);
    let ratio = used as f64 / limit as f64;
    let percent = (ratio * 100.0).min(255.0) as u8;
    if ratio >= CONTEXT_DANGER_THRESHOLD {
        ContextStatus::Critical { used, limit, percent }
    } else if ratio >= CONTEXT_WARN_THRESHOLD {
        ContextStatus::Warning { used, limit, percent }
    } else {
        ContextStatus::Ok { used, limit }
    }
}
