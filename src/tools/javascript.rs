//! JavaScript execution tool.
//!
//! Snippets are treated as a function body and run by Node inside the
//! process sandbox, with two more fences around them:
//!
//! - Node runs under its permission model, so the interpreter itself cannot
//!   read or write files, spawn processes or start workers.
//! - The snippet is evaluated in a `vm` context created from a
//!   null-prototype object. No host object is reachable from inside it, so
//!   `require`, `process` and the host realm are out of scope.
//!
//! The wrapper prints exactly one report line carrying the return value
//! (awaited if it is a promise) and the captured console output, sized to
//! fit the output cap.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use super::sandbox::{run_isolated, SandboxLimits};
use super::{ParamType, ParameterSchema, Tool};
use crate::config::JavascriptConfig;
use crate::constants::{JS_DEFAULT_RUNTIME, JS_PERMISSION_FLAG, SANDBOX_MAX_OUTPUT_SIZE};

const RESULT_MARKER: &str = "__tether_result__:";

/// Bytes of the output cap kept back for the marker and line breaks.
const REPORT_OVERHEAD: usize = 64;

const WRAPPER: &str = r#"const vm = require("vm");
const code = __TETHER_CODE__;
const budget = __TETHER_BUDGET__;

const ctx = vm.createContext(Object.create(null));
vm.runInContext(`
  globalThis.__logs = [];
  const show = (v) => {
    if (typeof v === "string") return v;
    try { const s = JSON.stringify(v); return s === undefined ? String(v) : s; } catch (_) { return String(v); }
  };
  const log = (...args) => { __logs.push(args.map(show).join(" ")); };
  globalThis.console = { log, info: log, warn: log, error: log, debug: log };
`, ctx);

const clip = (text, limit) =>
  Buffer.byteLength(text) <= limit
    ? text
    : Buffer.from(text).subarray(0, limit).toString() + "\n... output truncated at " + limit + " bytes";

const describe = (e) => {
  try { return e && e.message !== undefined ? String(e.message) : String(e); } catch (_) { return "uncaught exception"; }
};

(async () => {
  let report;
  try {
    ctx.__code = code;
    let result = vm.runInContext("new Function(__code)()", ctx);
    if (result && typeof result.then === "function") result = await result;
    const json = result === undefined ? undefined : JSON.stringify(result);
    if (json !== undefined && Buffer.byteLength(json) > budget / 2) {
      report = { ok: false, error: "result too large: " + Buffer.byteLength(json) + " bytes" };
    } else {
      report = { ok: true, result: json === undefined ? null : JSON.parse(json) };
    }
  } catch (e) {
    report = { ok: false, error: describe(e) };
  }

  let logs = "";
  try {
    logs = String(vm.runInContext("Array.isArray(__logs) ? __logs.join('\\n') : ''", ctx));
  } catch (_) {}

  let limit = Math.floor(budget / 2);
  let line;
  for (;;) {
    if (logs) report.console = clip(logs, limit);
    line = JSON.stringify(report);
    if (Buffer.byteLength(line) <= budget || limit < 64) break;
    limit = Math.floor(limit / 2);
  }
  process.stdout.write("\n__TETHER_MARKER__" + line + "\n");
})();
"#;

pub struct JavascriptTool {
    runtime: String,
    limits: SandboxLimits,
}

impl JavascriptTool {
    pub fn new(runtime: impl Into<String>, limits: SandboxLimits) -> Self {
        Self {
            runtime: runtime.into(),
            limits,
        }
    }

    pub fn from_config(config: &JavascriptConfig, timeout: Duration) -> Self {
        let runtime = config
            .runtime
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| JS_DEFAULT_RUNTIME.to_string());
        Self::new(
            runtime,
            SandboxLimits {
                timeout,
                max_output_bytes: config.max_output_bytes.unwrap_or(SANDBOX_MAX_OUTPUT_SIZE),
            },
        )
    }

    fn args(&self, code: &str) -> Result<Vec<String>> {
        let budget = self.limits.max_output_bytes.saturating_sub(REPORT_OVERHEAD).max(256);
        Ok(vec![
            JS_PERMISSION_FLAG.to_string(),
            "-e".to_string(),
            wrapper_script(code, budget)?,
        ])
    }
}

/// Script handed to the runtime. The snippet travels as a JSON string
/// literal so no quoting of user code is needed; it is substituted last so
/// its text is never rescanned for placeholders.
fn wrapper_script(code: &str, budget: usize) -> Result<String> {
    let literal = serde_json::to_string(code)?;
    Ok(WRAPPER
        .replace("__TETHER_MARKER__", RESULT_MARKER)
        .replace("__TETHER_BUDGET__", &budget.to_string())
        .replace("__TETHER_CODE__", &literal))
}

#[derive(Debug, Deserialize, PartialEq)]
struct ScriptReport {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    console: Option<String>,
}

/// Finds the report line in runtime stdout.
fn parse_report(stdout: &str) -> Option<ScriptReport> {
    let pos = stdout.rfind(RESULT_MARKER)?;
    let line = stdout[pos + RESULT_MARKER.len()..].lines().next()?;
    serde_json::from_str(line).ok()
}

#[derive(Deserialize)]
struct JavascriptInput {
    code: String,
}

#[async_trait::async_trait]
impl Tool for JavascriptTool {
    fn name(&self) -> &str {
        "javascript_execution"
    }

    fn description(&self) -> &str {
        "Securely run and display results of JavaScript code in an isolated sandbox"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::object().required(
            "code",
            ParamType::String,
            "JavaScript function body to execute; use `return` to produce a result",
        )
    }

    async fn execute(&self, input: Map<String, Value>) -> Result<Value> {
        let input: JavascriptInput = serde_json::from_value(Value::Object(input))?;

        // Spawn failures and timeouts are the executor's to report; only
        // script-level failures become a `success: false` payload
        let output = run_isolated(&self.runtime, &self.args(&input.code)?, &self.limits).await?;
        debug!(exit_code = output.exit_code, "javascript runtime finished");

        let (mut payload, console) = match parse_report(&output.stdout) {
            Some(ScriptReport {
                ok: true,
                result,
                console,
                ..
            }) => (
                json!({
                    "code": input.code,
                    "result": result,
                    "success": true,
                }),
                console,
            ),
            Some(ScriptReport { error, console, .. }) => (
                json!({
                    "code": input.code,
                    "error": error.unwrap_or_else(|| "unknown error".to_string()),
                    "success": false,
                }),
                console,
            ),
            None => {
                let stderr = output.stderr.trim();
                let error = if !stderr.is_empty() {
                    stderr.to_string()
                } else if output.success() {
                    "runtime exited without a result".to_string()
                } else {
                    format!("runtime exited with code {} without a result", output.exit_code)
                };
                (
                    json!({
                        "code": input.code,
                        "error": error,
                        "success": false,
                    }),
                    None,
                )
            }
        };
        if let Some(console) = console.filter(|c| !c.is_empty()) {
            payload["console"] = json!(console);
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(code: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("code".into(), json!(code));
        map
    }

    /// Node 22.13+ with the permission model. Tests that need a real
    /// runtime are skipped without one.
    fn node_available() -> bool {
        std::process::Command::new(JS_DEFAULT_RUNTIME)
            .args([JS_PERMISSION_FLAG, "-e", ""])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn node_tool() -> JavascriptTool {
        JavascriptTool::new(JS_DEFAULT_RUNTIME, SandboxLimits::default())
    }

    #[test]
    fn wrapper_embeds_code_as_string_literal() {
        let script = wrapper_script("return \"__TETHER_BUDGET__\";\n", 1000).unwrap();
        assert!(script.contains(r#"const code = "return \"__TETHER_BUDGET__\";\n";"#));
        assert!(script.contains("const budget = 1000;"));
        assert!(script.contains(RESULT_MARKER));
    }

    #[test]
    fn runtime_is_started_under_the_permission_model() {
        let args = node_tool().args("return 1").unwrap();
        assert_eq!(args[0], JS_PERMISSION_FLAG);
        assert_eq!(args[1], "-e");
    }

    #[test]
    fn report_is_found_after_stray_output() {
        let stdout = format!(
            "warning: noise\n{RESULT_MARKER}{{\"ok\":true,\"result\":4,\"console\":\"hi\"}}\n"
        );
        let report = parse_report(&stdout).unwrap();
        assert!(report.ok);
        assert_eq!(report.result, json!(4));
        assert_eq!(report.console.as_deref(), Some("hi"));
        assert!(parse_report("  partial  ").is_none());
    }

    #[tokio::test]
    async fn missing_runtime_is_an_execution_error() {
        let tool = JavascriptTool::new("tether-no-such-runtime", SandboxLimits::default());
        assert!(tool.execute(input("return 1")).await.is_err());
    }

    #[tokio::test]
    async fn returns_value_and_console_output() {
        if !node_available() {
            return;
        }
        let payload = node_tool()
            .execute(input("console.log('adding', {a: 2}); return 2 + 2;"))
            .await
            .unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(payload["result"], 4);
        assert_eq!(payload["console"], "adding {\"a\":2}");
    }

    #[tokio::test]
    async fn thrown_errors_are_reported_in_the_payload() {
        if !node_available() {
            return;
        }
        let payload = node_tool()
            .execute(input("throw new Error('nope')"))
            .await
            .unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], "nope");
    }

    #[tokio::test]
    async fn host_capabilities_are_unreachable() {
        if !node_available() {
            return;
        }
        let code = r#"
            const attempt = (f) => { try { return f(); } catch (e) { return "blocked"; } };
            return {
                require: typeof require,
                process: typeof process,
                escaped: attempt(() => typeof this.constructor.constructor("return process")()),
                passwd: attempt(() => require("fs").readFileSync("/etc/passwd", "utf8")),
            };
        "#;
        let payload = node_tool().execute(input(code)).await.unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(
            payload["result"],
            json!({
                "require": "undefined",
                "process": "undefined",
                "escaped": "blocked",
                "passwd": "blocked",
            })
        );
    }

    #[tokio::test]
    async fn interpreter_cannot_read_host_files() {
        if !node_available() {
            return;
        }
        let args = vec![
            JS_PERMISSION_FLAG.to_string(),
            "-e".to_string(),
            "try { require('fs').readFileSync('/etc/passwd'); console.log('read'); } catch (e) { console.log(e.code); }"
                .to_string(),
        ];
        let out = run_isolated(JS_DEFAULT_RUNTIME, &args, &SandboxLimits::default())
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "ERR_ACCESS_DENIED");
    }

    #[tokio::test]
    async fn large_console_output_keeps_the_result() {
        if !node_available() {
            return;
        }
        let code = "for (let i = 0; i < 20000; i++) console.log('line ' + i); return 4;";
        let payload = node_tool().execute(input(code)).await.unwrap();
        assert_eq!(payload["success"], true);
        assert_eq!(payload["result"], 4);
        let console = payload["console"].as_str().unwrap();
        assert!(console.starts_with("line 0\nline 1\n"));
        assert!(console.contains("output truncated"));
        assert!(console.len() <= SANDBOX_MAX_OUTPUT_SIZE);
    }
}
