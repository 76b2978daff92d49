//! Per-tool permission configuration.
//!
//! Provides [`PermissionManager`] which loads permission rules from config
//! and decides whether a tool call may run. Denied calls are reported back
//! to the model as error results instead of reaching the capability.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Permission level for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Allow,
    Deny,
}

/// Configuration for the permission system.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionConfig {
    /// Per-tool permissions: tool_name -> Permission
    #[serde(default)]
    pub tools: HashMap<String, Permission>,
}

/// Answers permission checks for the executor.
#[derive(Debug, Clone, Default)]
pub struct PermissionManager {
    config: PermissionConfig,
}

impl PermissionManager {
    pub fn new(config: PermissionConfig) -> Self {
        Self { config }
    }

    /// Tools not mentioned in the config are allowed.
    pub fn check(&self, tool_name: &str) -> Permission {
        self.config
            .tools
            .get(tool_name)
            .copied()
            .unwrap_or_default()
    }
}
