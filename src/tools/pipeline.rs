//! AI Pipe proxy tool.
//!
//! Sends a task plus input data through a secondary model completion. When
//! no endpoint is available, or the call fails, the tool answers with a
//! clearly marked simulated result instead of an error.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Instant;
use tracing::warn;

use super::{ParamType, ParameterSchema, Tool};
use crate::config::PipelineConfig;
use crate::constants::PIPELINE_DEFAULT_MODEL;
use crate::provider::{EndpointConfig, HttpCompletionClient};

pub struct PipelineTool {
    client: HttpCompletionClient,
    endpoint: Option<EndpointConfig>,
}

impl PipelineTool {
    pub fn new(endpoint: Option<EndpointConfig>) -> Self {
        Self {
            client: HttpCompletionClient::new(),
            endpoint,
        }
    }

    /// `[tools.pipeline]` overrides win over the session endpoint.
    pub fn from_config(config: &PipelineConfig, session: Option<&EndpointConfig>) -> Self {
        let endpoint = match (config.base_url.as_ref(), session) {
            (Some(base_url), _) => Some(EndpointConfig {
                base_url: base_url.clone(),
                api_key: config
                    .api_key
                    .clone()
                    .or_else(|| session.map(|s| s.api_key.clone()))
                    .unwrap_or_default(),
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| PIPELINE_DEFAULT_MODEL.to_string()),
                temperature: session.map_or(crate::constants::DEFAULT_TEMPERATURE, |s| s.temperature),
            }),
            (None, Some(session)) => {
                let mut endpoint = session.clone();
                if let Some(model) = &config.model {
                    endpoint.model = model.clone();
                }
                if let Some(key) = &config.api_key {
                    endpoint.api_key = key.clone();
                }
                Some(endpoint)
            }
            (None, None) => None,
        };
        Self::new(endpoint)
    }

    fn simulated(task: &str, data: &str, started: Instant, note: &str) -> Value {
        json!({
            "task": task,
            "input_data": data,
            "processed_data": format!("AI Pipe processed: {data} (Task: {task})"),
            "confidence": 0.95,
            "processing_time": started.elapsed().as_secs_f64() * 1000.0,
            "note": note,
        })
    }
}

#[derive(Deserialize)]
struct PipelineInput {
    task: String,
    data: String,
}

#[async_trait::async_trait]
impl Tool for PipelineTool {
    fn name(&self) -> &str {
        "ai_pipe_proxy"
    }

    fn description(&self) -> &str {
        "Use the AI Pipe API (https://aipipe.org/) for flexible AI dataflows and transformations"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::object()
            .required("task", ParamType::String, "The AI task or workflow to perform")
            .required(
                "data",
                ParamType::String,
                "Input data to process through the AI pipeline",
            )
    }

    async fn execute(&self, input: Map<String, Value>) -> Result<Value> {
        let PipelineInput { task, data } = serde_json::from_value(Value::Object(input))?;
        let started = Instant::now();

        let Some(endpoint) = &self.endpoint else {
            return Ok(Self::simulated(
                &task,
                &data,
                started,
                "Simulated result - no completion endpoint configured",
            ));
        };

        let prompt = format!(
            "Task: {task}\nData: {data}\nPlease process this data according to the task description."
        );
        match self.client.prompt(endpoint, &prompt).await {
            Ok(processed) => Ok(json!({
                "task": task,
                "input_data": data,
                "processed_data": processed,
                "processing_method": format!("Completion via {}", endpoint.model),
            })),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "pipeline completion failed, using simulation");
                Ok(Self::simulated(
                    &task,
                    &data,
                    started,
                    "Simulated result - AI Pipe API not available",
                ))
            }
        }
    }
}
