//! Environment variable substitution and derived settings.

use std::time::Duration;

use super::types::{Config, ProviderEntry};
use crate::constants::{
    DEFAULT_TEMPERATURE, MAX_AGENT_ITERATIONS, STREAM_TIMEOUT_SECS, TOOL_TIMEOUT_SECS,
};
use crate::provider::ProviderKind;

const REDACTED: &str = "********";

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.model = Self::resolve_str(&self.model);
        if let Some(ref mut sp) = self.system_prompt {
            *sp = Self::resolve_str(sp);
        }
        if let Some(ref mut dp) = self.default_provider {
            *dp = Self::resolve_str(dp);
        }
        Self::resolve_provider_entry(&mut self.provider.aipipe);
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        Self::resolve_provider_entry(&mut self.provider.ollama);

        let search = &mut self.tools.search;
        for field in [&mut search.api_key, &mut search.engine_id] {
            if let Some(value) = field {
                *value = Self::resolve_str(value);
            }
        }
        let pipeline = &mut self.tools.pipeline;
        for field in [&mut pipeline.api_key, &mut pipeline.base_url, &mut pipeline.model] {
            if let Some(value) = field {
                *value = Self::resolve_str(value);
            }
        }
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry's `api_key` and `base_url`.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            if let Some(ref mut key) = e.api_key {
                *key = Self::resolve_str(key);
            }
            if let Some(ref mut url) = e.base_url {
                *url = Self::resolve_str(url);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    pub fn provider_entry(&self, provider: &str) -> Option<&ProviderEntry> {
        match provider {
            "aipipe" => self.provider.aipipe.as_ref(),
            "openai" => self.provider.openai.as_ref(),
            "openrouter" => self.provider.openrouter.as_ref(),
            "ollama" => self.provider.ollama.as_ref(),
            _ => None,
        }
    }

    /// Resolve API key for a provider: env var first, then config value.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        // Check env var first (AIPIPE_API_KEY, OPENAI_API_KEY, etc.)
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }

        self.provider_entry(provider)
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Get the configured default provider name, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Model configured for `provider`: the provider entry's model, else the
    /// top-level model unless it is still the compile-time default.
    pub fn model_for(&self, provider: &ProviderKind) -> Option<String> {
        if let Some(model) = self.provider_entry(provider.key()).and_then(|e| e.model.clone()) {
            return Some(model);
        }
        let m = &self.model;
        if m == crate::constants::DEFAULT_MODEL {
            return None; // treat default as "not configured"
        }
        let prefix = format!("{}/", provider.key());
        Some(m.strip_prefix(&prefix).unwrap_or(m).to_string())
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(MAX_AGENT_ITERATIONS).max(1)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs.unwrap_or(STREAM_TIMEOUT_SECS))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs.unwrap_or(TOOL_TIMEOUT_SECS))
    }

    /// Copy safe to print: every non-empty credential is masked.
    pub fn redacted(&self) -> Config {
        fn mask(value: &mut Option<String>) {
            if value.as_deref().is_some_and(|v| !v.is_empty()) {
                *value = Some(REDACTED.to_string());
            }
        }
        let mut copy = self.clone();
        for entry in [
            &mut copy.provider.aipipe,
            &mut copy.provider.openai,
            &mut copy.provider.openrouter,
            &mut copy.provider.ollama,
        ]
        .into_iter()
        .flatten()
        {
            mask(&mut entry.api_key);
        }
        mask(&mut copy.tools.search.api_key);
        mask(&mut copy.tools.pipeline.api_key);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::permissions::Permission;

    #[test]
    fn env_placeholders_are_substituted() {
        std::env::set_var("TETHER_TEST_SUBST", "value");
        assert_eq!(Config::resolve_str("a-{env:TETHER_TEST_SUBST}-b"), "a-value-b");
        assert_eq!(Config::resolve_str("{env:TETHER_TEST_UNSET_VAR}"), "");
        assert_eq!(Config::resolve_str("{env:unterminated"), "{env:unterminated");
    }

    #[test]
    fn default_template_parses() {
        let config: Config = toml::from_str(&super::super::loader::default_toml()).unwrap();
        assert_eq!(config.provider_name(), Some("aipipe"));
        assert!(config.provider.ollama.is_some());
    }

    #[test]
    fn numeric_settings_fall_back_to_defaults() {
        let config = Config::default();
        assert_eq!(config.max_iterations(), MAX_AGENT_ITERATIONS);
        assert_eq!(config.tool_timeout(), Duration::from_secs(TOOL_TIMEOUT_SECS));
        assert_eq!(config.stream_timeout(), Duration::from_secs(STREAM_TIMEOUT_SECS));
        assert!((config.temperature() - 0.7).abs() < f32::EPSILON);

        let config: Config = toml::from_str("max_iterations = 3\ntool_timeout_secs = 2").unwrap();
        assert_eq!(config.max_iterations(), 3);
        assert_eq!(config.tool_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn project_values_win_field_by_field() {
        let global: Config = toml::from_str(
            r#"
max_iterations = 5
[provider.openai]
api_key = "global-key"
base_url = "https://global"
[permissions.tools]
google_search = "deny"
"#,
        )
        .unwrap();
        let project: Config = toml::from_str(
            r#"
[provider.openai]
base_url = "https://project"
[permissions.tools]
javascript_execution = "deny"
"#,
        )
        .unwrap();

        let merged = Config::merge(global, project);
        let openai = merged.provider.openai.as_ref().unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("global-key"));
        assert_eq!(openai.base_url.as_deref(), Some("https://project"));
        assert_eq!(merged.max_iterations(), 5);
        assert_eq!(merged.permissions.tools.get("google_search"), Some(&Permission::Deny));
        assert_eq!(
            merged.permissions.tools.get("javascript_execution"),
            Some(&Permission::Deny)
        );
    }

    #[test]
    fn configured_model_strips_own_provider_prefix() {
        let config = Config {
            model: "ollama/mistral".into(),
            ..Config::default()
        };
        assert_eq!(config.model_for(&ProviderKind::Ollama).as_deref(), Some("mistral"));
        assert_eq!(config.model_for(&ProviderKind::AiPipe).as_deref(), Some("ollama/mistral"));
        assert_eq!(Config::default().model_for(&ProviderKind::OpenAI), None);
    }

    #[test]
    fn redacted_masks_credentials() {
        let mut config = Config::default();
        config.tools.search = SearchConfig {
            api_key: Some("secret".into()),
            ..SearchConfig::default()
        };
        let shown = toml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains(REDACTED));
    }
}
