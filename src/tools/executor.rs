//! Tool dispatch.
//!
//! [`ToolExecutor`] is the only place a [`ToolCall`] meets a capability. It
//! never fails: unknown tools, bad parameters, capability errors, panics and
//! timeouts all come back as error [`ToolResult`]s.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{ToolCall, ToolError, ToolRegistry, ToolResult};
use crate::permissions::{Permission, PermissionManager};

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    permissions: PermissionManager,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>, permissions: PermissionManager, timeout: Duration) -> Self {
        Self {
            registry,
            permissions,
            timeout,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs a single call to completion.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        match self.try_execute(call).await {
            Ok(payload) => {
                debug!(
                    tool = %call.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tool call succeeded"
                );
                ToolResult::success(&call.name, payload)
            }
            Err(err) => {
                warn!(tool = %call.name, error = %err, "tool call failed");
                ToolResult::error(&call.name, err.to_string())
            }
        }
    }

    /// Runs every call concurrently and returns the results in call order,
    /// whatever order they finish in. Duplicate calls run independently.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        futures::future::join_all(calls.iter().map(|call| self.execute(call))).await
    }

    async fn try_execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let spec = self.registry.resolve(&call.name)?;
        let tool = self
            .registry
            .capability(&spec.name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: call.name.clone(),
            })?;

        if self.permissions.check(&spec.name) == Permission::Deny {
            return Err(ToolError::PermissionDenied {
                tool: spec.name.clone(),
            });
        }

        spec.parameters
            .validate(&call.parameters)
            .map_err(|reason| ToolError::InvalidToolParameters {
                tool: spec.name.clone(),
                reason,
            })?;

        let invocation = AssertUnwindSafe(tool.execute(call.parameters.clone())).catch_unwind();
        match tokio::time::timeout(self.timeout, invocation).await {
            Err(_) => Err(ToolError::Timeout {
                tool: spec.name.clone(),
                secs: self.timeout.as_secs(),
            }),
            Ok(Err(_panic)) => Err(ToolError::ToolExecutionFailure {
                tool: spec.name.clone(),
                reason: "capability panicked".to_string(),
            }),
            Ok(Ok(Err(e))) => Err(ToolError::ToolExecutionFailure {
                tool: spec.name.clone(),
                reason: format!("{e:#}"),
            }),
            Ok(Ok(Ok(payload))) => Ok(payload),
        }
    }
}
