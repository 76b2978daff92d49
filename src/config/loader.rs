//! File loading and merging for tether configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::types::{
    default_model, Config, JavascriptConfig, PipelineConfig, ProviderConfig, ProviderEntry,
    SearchConfig, ToolsConfig,
};

/// Written to `config.toml` on first run.
pub(super) fn default_toml() -> String {
    format!(
        r#"model = "{}"
default_provider = "{}"
# temperature = 0.7
# max_iterations = 10
# stream_timeout_secs = 120
# tool_timeout_secs = 30

[provider]

[provider.aipipe]
api_key = "{{env:AIPIPE_API_KEY}}"

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.ollama]
base_url = "http://localhost:11434/v1"

[tools.search]
api_key = "{{env:GOOGLE_API_KEY}}"
engine_id = "{{env:GOOGLE_CSE_ID}}"

[tools.javascript]
runtime = "node"
"#,
        default_model(),
        crate::constants::DEFAULT_PROVIDER,
    )
}

impl Config {
    /// Loads the global config from `~/.config/tether/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            debug!(path = %path.display(), "wrote default config");
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        Self::load_file(&path)
    }

    pub(super) fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Look for tether.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                debug!(path = %candidate.display(), "loading project config");
                return Self::load_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut permissions = global.permissions;
        permissions.tools.extend(project.permissions.tools);

        Config {
            model: if project.model != default_model() {
                project.model
            } else {
                global.model
            },
            provider: ProviderConfig {
                aipipe: merge_entry(global.provider.aipipe, project.provider.aipipe),
                openai: merge_entry(global.provider.openai, project.provider.openai),
                openrouter: merge_entry(global.provider.openrouter, project.provider.openrouter),
                ollama: merge_entry(global.provider.ollama, project.provider.ollama),
            },
            default_provider: project.default_provider.or(global.default_provider),
            system_prompt: project.system_prompt.or(global.system_prompt),
            temperature: project.temperature.or(global.temperature),
            max_iterations: project.max_iterations.or(global.max_iterations),
            stream_timeout_secs: project.stream_timeout_secs.or(global.stream_timeout_secs),
            tool_timeout_secs: project.tool_timeout_secs.or(global.tool_timeout_secs),
            tools: ToolsConfig {
                search: SearchConfig {
                    api_key: project.tools.search.api_key.or(global.tools.search.api_key),
                    engine_id: project.tools.search.engine_id.or(global.tools.search.engine_id),
                    max_results: project.tools.search.max_results.or(global.tools.search.max_results),
                },
                pipeline: PipelineConfig {
                    model: project.tools.pipeline.model.or(global.tools.pipeline.model),
                    base_url: project.tools.pipeline.base_url.or(global.tools.pipeline.base_url),
                    api_key: project.tools.pipeline.api_key.or(global.tools.pipeline.api_key),
                },
                javascript: JavascriptConfig {
                    runtime: project.tools.javascript.runtime.or(global.tools.javascript.runtime),
                    max_output_bytes: project
                        .tools
                        .javascript
                        .max_output_bytes
                        .or(global.tools.javascript.max_output_bytes),
                },
            },
            permissions,
        }
    }
}

/// Field-wise merge of one provider entry; project fields win.
fn merge_entry(global: Option<ProviderEntry>, project: Option<ProviderEntry>) -> Option<ProviderEntry> {
    match (global, project) {
        (Some(g), Some(p)) => Some(ProviderEntry {
            api_key: p.api_key.or(g.api_key),
            base_url: p.base_url.or(g.base_url),
            model: p.model.or(g.model),
        }),
        (g, p) => p.or(g),
    }
}
