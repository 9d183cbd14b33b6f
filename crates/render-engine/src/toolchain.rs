//! External media toolchain invocation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// External binary to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }
}

/// One blocking toolchain call with its own timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub args: Vec<String>,
    pub timeout: Duration,

    /// Short operation name used in logs and errors ("fade", "concat", ...).
    pub label: String,
}

impl ToolInvocation {
    pub fn new(tool: Tool, label: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool,
            args: Vec::new(),
            timeout,
            label: label.into(),
        }
    }

    pub fn ffmpeg(label: impl Into<String>, timeout_secs: u64) -> Self {
        Self::new(Tool::Ffmpeg, label, Duration::from_secs(timeout_secs))
    }

    pub fn ffprobe(label: impl Into<String>, timeout_secs: u64) -> Self {
        Self::new(Tool::Ffprobe, label, Duration::from_secs(timeout_secs))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }
}

/// Captured output of a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Toolchain failure. Callers decide whether it degrades or aborts.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("{label} timed out after {secs}s")]
    TimedOut { label: String, secs: u64 },

    #[error("{label} failed (exit {code:?}): {stderr}")]
    Failed {
        label: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Could not read media duration: {0}")]
    Probe(String),
}

/// Runs toolchain invocations.
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if the toolchain is usable on this system.
    async fn is_available(&self) -> bool;

    /// Run one invocation to completion.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// Backend that spawns `ffmpeg`/`ffprobe` from `PATH`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    probe_timeout_secs: u64,
}

impl FfmpegBackend {
    pub fn new(probe_timeout_secs: u64) -> Self {
        Self { probe_timeout_secs }
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait::async_trait]
impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn is_available(&self) -> bool {
        let probe = ToolInvocation::ffmpeg("version", self.probe_timeout_secs).arg("-version");
        match self.run(&probe).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "ffmpeg not available");
                false
            }
        }
    }

    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        tracing::debug!(
            tool = invocation.tool.binary(),
            label = %invocation.label,
            args = ?invocation.args,
            "Running media tool"
        );

        let mut cmd = Command::new(invocation.tool.binary());
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = std::time::Instant::now();
        let output = match tokio::time::timeout(invocation.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| ToolError::Spawn {
                tool: invocation.tool.binary(),
                source: e,
            })?,
            Err(_) => {
                return Err(ToolError::TimedOut {
                    label: invocation.label.clone(),
                    secs: invocation.timeout.as_secs(),
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(ToolError::Failed {
                label: invocation.label.clone(),
                code: output.status.code(),
                stderr: tail(&stderr, 20),
            });
        }

        tracing::debug!(
            label = %invocation.label,
            elapsed_ms = started.elapsed().as_millis(),
            "Media tool finished"
        );
        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        })
    }
}

/// Media duration in seconds, read with ffprobe.
pub async fn probe_duration(
    backend: &dyn MediaBackend,
    path: &Path,
    timeout_secs: u64,
) -> Result<f64, ToolError> {
    let invocation = ToolInvocation::ffprobe("probe_duration", timeout_secs)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .path(path);

    let output = backend.run(&invocation).await?;
    let raw = output.stdout.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ToolError::Probe(format!("{}: {raw:?}", path.display())))
}

/// Last `lines` lines of tool output.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
