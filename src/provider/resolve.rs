//! Model and endpoint resolution for tether.
//!
//! Resolves which provider and model to use based on CLI flags, config file,
//! and hardcoded defaults, then turns that selection into the
//! [`EndpointConfig`] the completion client needs.

use anyhow::{bail, Result};

use super::client::EndpointConfig;
use super::kind::{default_model_for, ProviderKind};
use crate::config::Config;

use crate::constants::DEFAULT_PROVIDER;

/// Resolved provider + model pair.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Resolve which provider and model to use.
/// Priority: CLI flags > config.toml > defaults.
///
/// Accepts these formats:
///   --model openrouter/openai/gpt-4o-mini  (provider/model shorthand, only when --provider is omitted)
///   --model meta-llama/llama-3-8b  (prefix is not a provider, so the whole string is the model)
///   --provider openai --model gpt-4o-mini
///   --provider ollama  (uses provider's default model)
///   (nothing)  (uses config.toml, then hardcoded default)
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<ModelSelection> {
    // Shorthand only applies when the prefix names a provider
    if cli_provider.is_none() {
        if let Some((prov, model)) = cli_model.and_then(|m| m.split_once('/')) {
            if let Ok(provider) = ProviderKind::from_str(prov) {
                return Ok(ModelSelection {
                    provider,
                    model: model.to_string(),
                });
            }
        }
    }

    let provider_str = cli_provider
        .or(config.provider_name())
        .unwrap_or(DEFAULT_PROVIDER);
    let provider = ProviderKind::from_str(provider_str)?;

    let model = cli_model
        .map(String::from)
        .or_else(|| config.model_for(&provider))
        .unwrap_or_else(|| default_model_for(&provider).to_string());

    Ok(ModelSelection { provider, model })
}

/// Builds the endpoint for a selection.
///
/// Fails when the provider needs a credential and none is configured; the
/// caller decides whether that is fatal.
pub fn resolve_endpoint(config: &Config, selection: &ModelSelection) -> Result<EndpointConfig> {
    let provider = selection.provider;
    let api_key = config.resolve_api_key(provider.key()).unwrap_or_default();
    if provider.requires_auth() && api_key.is_empty() {
        bail!(
            "No API key found for {}. Set {}_API_KEY or configure [provider.{}] in config.toml",
            provider.display_name(),
            provider.key().to_uppercase(),
            provider.key(),
        );
    }

    let base_url = config
        .provider_entry(provider.key())
        .and_then(|e| e.base_url.clone())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| provider.default_base_url());

    Ok(EndpointConfig {
        base_url,
        api_key,
        model: selection.model.clone(),
        temperature: config.temperature(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_shorthand_keeps_nested_model_path() {
        let sel = resolve_model(None, Some("openrouter/openai/gpt-4o-mini"), &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenRouter);
        assert_eq!(sel.model, "openai/gpt-4o-mini");
    }

    #[test]
    fn non_provider_prefix_is_part_of_model_name() {
        let sel = resolve_model(Some("openrouter"), Some("meta-llama/llama-3-8b"), &Config::default()).unwrap();
        assert_eq!(sel.model, "meta-llama/llama-3-8b");

        let sel = resolve_model(None, Some("meta-llama/llama-3-8b"), &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::AiPipe);
        assert_eq!(sel.model, "meta-llama/llama-3-8b");
    }

    #[test]
    fn defaults_to_aipipe() {
        let sel = resolve_model(None, None, &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::AiPipe);
        assert_eq!(sel.model, crate::constants::DEFAULT_MODEL);
    }

    #[test]
    fn ollama_needs_no_key() {
        let sel = ModelSelection {
            provider: ProviderKind::Ollama,
            model: "llama3".into(),
        };
        let endpoint = resolve_endpoint(&Config::default(), &sel).unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:11434/v1");
        assert!(endpoint.api_key.is_empty());
    }
}
