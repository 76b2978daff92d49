//! Process-level isolation for untrusted code.
//!
//! Children run in a throwaway scratch directory with a cleared environment,
//! no stdin, a wall-clock limit and a cap on captured output. This layer
//! only contains the process; restricting what the interpreter itself may
//! touch is up to the caller (see `javascript.rs`).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::constants::{APP_NAME, SANDBOX_MAX_OUTPUT_SIZE, SANDBOX_PATH};

#[derive(Debug, Clone)]
pub struct SandboxLimits {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::constants::TOOL_TIMEOUT_SECS),
            max_output_bytes: SANDBOX_MAX_OUTPUT_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SandboxOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl SandboxOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to prepare sandbox directory: {0}")]
    Setup(#[source] std::io::Error),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sandboxed process failed: {0}")]
    Execution(#[source] std::io::Error),
    #[error("sandboxed process timed out after {0:?}")]
    Timeout(Duration),
}

/// Scratch directory removed when dropped.
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn create() -> Result<Self, SandboxError> {
        let path = std::env::temp_dir().join(format!("{APP_NAME}-sandbox-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).map_err(SandboxError::Setup)?;
        Ok(Self(path))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.0) {
            warn!(path = %self.0.display(), error = %e, "failed to remove sandbox directory");
        }
    }
}

/// Truncate `output` to at most `limit` bytes, appending a notice when
/// truncation occurs.
pub fn cap_output(output: &str, limit: usize) -> String {
    if output.len() <= limit {
        return output.to_string();
    }
    let mut end = limit;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... output truncated at {} bytes", &output[..end], limit)
}

/// Run `program` with `args` inside a fresh scratch directory.
///
/// The child is killed if the limit elapses or the future is dropped.
pub async fn run_isolated(
    program: &str,
    args: &[String],
    limits: &SandboxLimits,
) -> Result<SandboxOutput, SandboxError> {
    let scratch = ScratchDir::create()?;
    let started = Instant::now();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(scratch.path())
        .env_clear()
        .env("PATH", SANDBOX_PATH)
        .env("HOME", scratch.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| SandboxError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let output = tokio::time::timeout(limits.timeout, child.wait_with_output())
        .await
        .map_err(|_| SandboxError::Timeout(limits.timeout))?
        .map_err(SandboxError::Execution)?;

    let duration = started.elapsed();
    let exit_code = output.status.code().unwrap_or(-1);
    debug!(program, exit_code, elapsed_ms = duration.as_millis() as u64, "sandboxed process exited");

    Ok(SandboxOutput {
        exit_code,
        stdout: cap_output(&String::from_utf8_lossy(&output.stdout), limits.max_output_bytes),
        stderr: cap_output(&String::from_utf8_lossy(&output.stderr), limits.max_output_bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_output_respects_char_boundaries() {
        let text = "héllo";
        let capped = cap_output(text, 2);
        assert!(capped.starts_with('h'));
        assert!(capped.contains("truncated at 2 bytes"));
        assert_eq!(cap_output("short", 10), "short");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run_isolated("tether-definitely-not-a-binary", &[], &SandboxLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn environment_is_cleared() {
        std::env::set_var("TETHER_SANDBOX_SECRET", "leak");
        let out = run_isolated(
            "sh",
            &["-c".to_string(), "echo \"[$TETHER_SANDBOX_SECRET]\"; pwd".to_string()],
            &SandboxLimits::default(),
        )
        .await
        .unwrap();
        assert!(out.success());
        assert!(out.stdout.starts_with("[]"));
        assert!(out.stdout.contains("tether-sandbox-"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn long_running_process_times_out() {
        let limits = SandboxLimits {
            timeout: Duration::from_millis(100),
            ..SandboxLimits::default()
        };
        let err = run_isolated("sh", &["-c".to_string(), "sleep 5".to_string()], &limits)
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::Timeout(_)));
    }
}
