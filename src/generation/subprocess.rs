//! Claude CLI spawning.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::{API_KEY_ENV_VAR, AuthMode};
use crate::error::{ClaudeError, stderr_excerpt};

/// Flags that would resume or continue an earlier conversation.
///
/// None of these may ever reach the subprocess.
pub const SESSION_FLAGS: &[&str] = &[
    "--continue",
    "-c",
    "--resume",
    "-r",
    "--session-id",
    "--fork-session",
];

/// Whether `arg` would attach the invocation to an earlier session.
pub fn is_session_flag(arg: &str) -> bool {
    SESSION_FLAGS
        .iter()
        .any(|flag| arg == *flag || arg.starts_with(&format!("{}=", flag)))
}

/// Per-process environment changes, applied to the child `Command` only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    remove: Vec<String>,
}

impl EnvOverrides {
    /// Inherit the parent environment unchanged.
    pub fn none() -> Self {
        Self::default()
    }

    /// Overrides implied by the authentication mode.
    pub fn for_auth(mode: AuthMode) -> Self {
        match mode {
            AuthMode::Subscription => Self {
                remove: vec![API_KEY_ENV_VAR.to_string()],
            },
            AuthMode::ApiKey => Self::none(),
        }
    }

    pub fn removes(&self, key: &str) -> bool {
        self.remove.iter().any(|k| k == key)
    }

    pub fn removed(&self) -> &[String] {
        &self.remove
    }

    fn apply(&self, cmd: &mut Command) {
        for key in &self.remove {
            cmd.env_remove(key);
        }
    }
}

/// Everything needed to launch one subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Written to the child's stdin, which is then closed.
    pub stdin: String,
    pub env: EnvOverrides,
    pub timeout: Duration,
}

/// Trait for launching the generation subprocess.
///
/// This abstraction allows mocking the Claude subprocess in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the process and return its stdout on success.
    async fn run(&self, spec: &ProcessSpec) -> Result<String, ClaudeError>;
}

/// Runner that spawns a real process with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubprocessRunner;

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<String, ClaudeError> {
        run_process(spec).await
    }
}

/// Arguments for one Claude CLI invocation.
///
/// Always a fresh print-mode session: no continuation or resume flag is ever
/// produced.
pub fn build_args(model: &str, system_prompt: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        "--model".to_string(),
        model.to_string(),
        "--output-format".to_string(),
        "json".to_string(),
    ];

    if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
        args.push("--append-system-prompt".to_string());
        args.push(prompt.to_string());
    }

    debug_assert!(!args.iter().any(|a| is_session_flag(a)));
    args
}

/// Spawn the process, feed stdin, and collect stdout within the timeout.
///
/// The child is killed if the timeout elapses.
pub async fn run_process(spec: &ProcessSpec) -> Result<String, ClaudeError> {
    let timeout_secs = spec.timeout.as_secs();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    spec.env.apply(&mut cmd);

    debug!(
        program = %spec.program,
        args = spec.args.len(),
        stdin_bytes = spec.stdin.len(),
        "Spawning generation subprocess"
    );

    let mut child = cmd.spawn().map_err(ClaudeError::SpawnFailed)?;
    let stdin = child.stdin.take();
    let payload = spec.stdin.as_bytes();

    let write_stdin = async move {
        if let Some(mut pipe) = stdin {
            match pipe.write_all(payload).await {
                // The child stopped reading; its exit status tells the story.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                other => other?,
            }
            pipe.shutdown().await.or_else(|e| {
                if e.kind() == ErrorKind::BrokenPipe {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
        }
        Ok::<(), std::io::Error>(())
    };

    let (write_result, output) = timeout(spec.timeout, async {
        tokio::join!(write_stdin, child.wait_with_output())
    })
    .await
    .map_err(|_| ClaudeError::Timeout(timeout_secs))?;

    let output = output.map_err(ClaudeError::SpawnFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        return Err(ClaudeError::NonZeroExit {
            code,
            stderr: stderr_excerpt(&stderr),
        });
    }

    write_result.map_err(ClaudeError::StdinFailed)?;

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Check if the Claude CLI is installed and accessible.
///
/// Uses the `which` crate for cross-platform executable detection, then
/// verifies the binary actually runs.
pub async fn check_claude_installed(program: &str) -> Result<(), ClaudeError> {
    if which::which(program).is_err() {
        return Err(ClaudeError::NotInstalled);
    }

    let version_check = Command::new(program)
        .arg("--version")
        .output()
        .await
        .map_err(ClaudeError::SpawnFailed)?;

    if !version_check.status.success() {
        return Err(ClaudeError::NotInstalled);
    }

    Ok(())
}

/// Claude CLI JSON envelope when using --output-format json
#[derive(serde::Deserialize)]
struct ClaudeCliResponse {
    result: String,
    #[serde(default)]
    is_error: bool,
}

/// Unwrap the CLI's JSON envelope; non-JSON stdout is taken verbatim.
///
/// An envelope flagged `is_error` or an empty result is a failure.
pub fn parse_cli_response(stdout: &str) -> Result<String, ClaudeError> {
    let content = match serde_json::from_str::<ClaudeCliResponse>(stdout.trim()) {
        Ok(envelope) if envelope.is_error => {
            return Err(ClaudeError::ExecutionFailed(envelope.result));
        }
        Ok(envelope) => envelope.result,
        Err(_) => stdout.to_string(),
    };

    if content.trim().is_empty() {
        return Err(ClaudeError::EmptyOutput);
    }

    Ok(content)
}
