//! Model listing and discovery.
//!
//! Displays available models grouped by provider, including dynamically
//! queried Ollama models. Isolates display/UI concerns from the provider core.

use anyhow::Result;
use tracing::debug;

use super::kind::ProviderKind;
use super::resolve::resolve_model;
use crate::config::Config;

/// List all available models, grouped by provider.
pub async fn list_models(config: &Config) -> Result<()> {
    let selection = resolve_model(None, None, config)?;
    let current = &selection.model;

    println!("Available models:\n");

    for provider in ProviderKind::ALL {
        println!("  {} ({}):", provider.key(), provider.display_name());
        if provider == ProviderKind::Ollama {
            match list_ollama_models(config).await {
                Ok(models) if models.is_empty() => {
                    println!("    (no models found -- run `ollama pull llama3`)");
                }
                Ok(models) => {
                    for model in &models {
                        let marker = marker(provider == selection.provider && model == current);
                        println!("    {model}{marker}");
                    }
                }
                Err(e) => {
                    debug!(error = %e, "ollama listing failed");
                    println!("    (ollama not running)");
                }
            }
        } else {
            for info in crate::models::catalog(provider) {
                let marker = marker(provider == selection.provider && info.name == current);
                println!("    {}{marker}", info.name);
            }
        }
        println!();
    }

    Ok(())
}

fn marker(selected: bool) -> &'static str {
    if selected {
        " (default)"
    } else {
        ""
    }
}

/// Query Ollama's local API for available models.
async fn list_ollama_models(config: &Config) -> Result<Vec<String>> {
    let base_url = config
        .provider_entry(ProviderKind::Ollama.key())
        .and_then(|o| o.base_url.as_deref())
        .unwrap_or(crate::constants::OLLAMA_DEFAULT_BASE_URL);

    // The tags API lives beside the OpenAI-compatible `/v1` root
    let root = base_url.trim_end_matches('/').trim_end_matches("/v1");
    let url = format!("{root}/api/tags");

    let resp: serde_json::Value = reqwest::get(&url).await?.json().await?;

    let models = resp["models"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(models)
}
