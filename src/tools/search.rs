//! Web search tool.
//!
//! The ranking itself comes from a [`SearchBackend`]: the Google Custom
//! Search JSON API when credentials are configured, otherwise a simulated
//! backend. Backend failures never surface as tool errors; the payload
//! degrades to an empty result list with an explanatory note.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::{ParamType, ParameterSchema, Tool};
use crate::config::SearchConfig;
use crate::constants::{
    GOOGLE_SEARCH_URL, SEARCH_DEFAULT_RESULTS, SEARCH_MAX_RESULTS, SEARCH_SIMULATED_MAX,
};

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
    #[serde(default, rename = "displayLink", alias = "display_link")]
    pub display_link: String,
}

/// Source of ranked results for a query.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Note attached to every payload from this backend, if any.
    fn note(&self) -> Option<&str> {
        None
    }
}

/// Deterministic offline results.
pub struct SimulatedSearch;

#[async_trait::async_trait]
impl SearchBackend for SimulatedSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        Ok((1..=limit.min(SEARCH_SIMULATED_MAX))
            .map(|i| SearchHit {
                title: format!("{query} - Result {i}"),
                link: format!("https://example{i}.com/search-result"),
                snippet: format!(
                    "This is a search result snippet for \"{query}\". It contains relevant information about the topic."
                ),
                display_link: format!("example{i}.com"),
            })
            .collect())
    }

    fn note(&self) -> Option<&str> {
        Some("Simulated results - set [tools.search] api_key and engine_id for live Google results")
    }
}

/// Google Custom Search JSON API.
pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
}

impl GoogleSearch {
    pub fn new(api_key: String, engine_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            engine_id,
        }
    }
}

#[derive(Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

#[async_trait::async_trait]
impl SearchBackend for GoogleSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let num = limit.to_string();
        let response = self
            .client
            .get(GOOGLE_SEARCH_URL)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .context("search request failed")?
            .error_for_status()
            .context("search API returned an error status")?;
        let body: GoogleResponse = response
            .json()
            .await
            .context("search API returned malformed JSON")?;
        Ok(body.items.into_iter().take(limit).collect())
    }
}

pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
    max_results: usize,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            max_results: SEARCH_MAX_RESULTS,
        }
    }

    /// Picks the live backend when both credentials are present.
    pub fn from_config(config: &SearchConfig) -> Self {
        let backend: Arc<dyn SearchBackend> = match (&config.api_key, &config.engine_id) {
            (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => {
                Arc::new(GoogleSearch::new(key.clone(), cx.clone()))
            }
            _ => Arc::new(SimulatedSearch),
        };
        let mut tool = Self::new(backend);
        if let Some(max) = config.max_results {
            tool.max_results = max.clamp(1, SEARCH_MAX_RESULTS);
        }
        tool
    }
}

#[derive(Deserialize)]
struct SearchInput {
    query: String,
    num_results: Option<i64>,
}

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn description(&self) -> &str {
        "Search the web using Google Search API - returns snippet results for user queries"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::object()
            .required("query", ParamType::String, "The search query to execute")
            .optional(
                "num_results",
                ParamType::Integer,
                "Number of results to return (default 5)",
                Some(json!(SEARCH_DEFAULT_RESULTS)),
            )
    }

    async fn execute(&self, input: Map<String, Value>) -> Result<Value> {
        let input: SearchInput = serde_json::from_value(Value::Object(input))?;
        let limit = input
            .num_results
            .map(|n| n.clamp(1, self.max_results as i64) as usize)
            .unwrap_or(SEARCH_DEFAULT_RESULTS.min(self.max_results));

        let started = Instant::now();
        let outcome = self.backend.search(&input.query, limit).await;
        let search_time = started.elapsed().as_secs_f64();

        match outcome {
            Ok(results) => {
                debug!(query = %input.query, count = results.len(), "search finished");
                let mut payload = json!({
                    "query": input.query,
                    "results_count": results.len(),
                    "search_time": search_time,
                    "results": results,
                });
                if let Some(note) = self.backend.note() {
                    payload["note"] = json!(note);
                }
                Ok(payload)
            }
            Err(e) => {
                warn!(query = %input.query, error = %e, "search backend failed");
                Ok(json!({
                    "query": input.query,
                    "results_count": 0,
                    "search_time": search_time,
                    "error": format!("{e:#}"),
                    "results": [],
                    "note": "Search failed - check the [tools.search] configuration",
                }))
            }
        }
    }
}
