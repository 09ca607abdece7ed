use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::output::parse_report_output;
use crate::error::{InsightsError, Result};
use crate::models::{RawAnalysisReport, TranscriptDocument, TranscriptSegment};

pub const DEFAULT_COMMAND: &str = "python3 insights.py";
pub const DEFAULT_TRANSCRIPT_ENV: [&str; 2] = ["TRANSCRIPT_FILE", "TRANSCRIPT_FILE_PATH"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Anything that turns transcript segments into a raw analysis report
#[async_trait]
pub trait AnalysisRunner: Send + Sync {
    /// Analyze `segments` for the call identified by `call_key`
    async fn run(&self, call_key: &str, segments: &[TranscriptSegment]) -> Result<RawAnalysisReport>;
}

/// Configuration for the external analysis process
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Executable to launch (e.g. "python3")
    pub program: String,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Working directory of the process, inherited when unset
    pub current_dir: Option<PathBuf>,
    /// Directory transcript artifacts are written to
    pub work_dir: PathBuf,
    /// Environment variables carrying the artifact path to the process
    pub transcript_env: Vec<String>,
    /// Upper bound on one invocation
    pub timeout: Duration,
    /// Stderr fragments that mark a run as failed even on exit code zero
    pub fatal_stderr_markers: Vec<String>,
}

impl AnalysisConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
            work_dir: std::env::temp_dir(),
            transcript_env: DEFAULT_TRANSCRIPT_ENV.iter().map(|name| name.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            fatal_stderr_markers: vec!["Traceback (most recent call last)".to_string()],
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let command = std::env::var("INSIGHTS_COMMAND").unwrap_or_else(|_| DEFAULT_COMMAND.to_string());
        let (program, args) = parse_command(&command)?;
        let mut config = Self::new(program, args);

        if let Ok(secs) = std::env::var("INSIGHTS_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                InsightsError::Config(format!("INSIGHTS_TIMEOUT_SECS is not a number: {:?}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var("INSIGHTS_WORK_DIR") {
            config.work_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("INSIGHTS_CWD") {
            config.current_dir = Some(PathBuf::from(dir));
        }
        if let Ok(names) = std::env::var("INSIGHTS_TRANSCRIPT_ENV") {
            config.transcript_env = parse_env_names(&names)?;
        }

        Ok(config)
    }
}

/// Split a whitespace-separated command line into program and arguments
pub fn parse_command(command: &str) -> Result<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| InsightsError::Config("analysis command is empty".to_string()))?;
    Ok((program, parts.collect()))
}

/// Comma-separated environment variable names
fn parse_env_names(names: &str) -> Result<Vec<String>> {
    let names: Vec<String> = names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(InsightsError::Config("INSIGHTS_TRANSCRIPT_ENV names no variable".to_string()));
    }
    Ok(names)
}

/// Runs the analysis routine as a child process.
///
/// Handshake: the segments are written as `{"transcript": [...]}` to an
/// artifact file, the file path is exported through every `transcript_env` name, and
/// the process's stdout is read as the raw report. Every invocation gets
/// its own artifact path, so concurrent calls never share input.
pub struct ProcessRunner {
    config: AnalysisConfig,
}

impl ProcessRunner {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn artifact_path(&self, call_key: &str) -> PathBuf {
        let key: String = call_key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .take(64)
            .collect();
        self.config.work_dir.join(format!(
            "transcript-{}-{}.json",
            key,
            uuid::Uuid::new_v4().simple()
        ))
    }

    async fn execute(&self, artifact: &Path) -> Result<RawAnalysisReport> {
        let program = &self.config.program;

        let mut command = Command::new(program);
        command
            .args(&self.config.args)
            .envs(self.config.transcript_env.iter().map(|name| (name, artifact)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.current_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| InsightsError::AnalysisProcess(format!("failed to start {}: {}", program, e)))?;

        // Dropping the wait future on timeout kills the child.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| {
                InsightsError::AnalysisProcess(format!("failed to collect output of {}: {}", program, e))
            })?,
            Err(_) => {
                warn!("Analysis process exceeded {:?}, killed", self.config.timeout);
                return Err(InsightsError::AnalysisTimeout(self.config.timeout));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        if !output.status.success() {
            return Err(InsightsError::AnalysisProcess(format!(
                "{} exited with {}: {}",
                program, output.status, stderr
            )));
        }

        if let Some(marker) = self
            .config
            .fatal_stderr_markers
            .iter()
            .find(|marker| stderr.contains(marker.as_str()))
        {
            return Err(InsightsError::AnalysisProcess(format!(
                "{} reported a fatal error ({}): {}",
                program, marker, stderr
            )));
        }

        if !stderr.is_empty() {
            warn!(stderr = %stderr, "Analysis process wrote warnings");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("Analysis process produced {} bytes", stdout.len());
        parse_report_output(&stdout)
    }
}

#[async_trait]
impl AnalysisRunner for ProcessRunner {
    async fn run(&self, call_key: &str, segments: &[TranscriptSegment]) -> Result<RawAnalysisReport> {
        let artifact = self.artifact_path(call_key);
        write_artifact(&artifact, segments).await?;
        info!("Running analysis for {} with {:?}", call_key, artifact);

        let outcome = self.execute(&artifact).await;

        if let Err(e) = tokio::fs::remove_file(&artifact).await {
            debug!("Could not remove artifact {:?}: {}", artifact, e);
        }

        outcome
    }
}

async fn write_artifact(path: &Path, segments: &[TranscriptSegment]) -> Result<()> {
    let document = serde_json::to_vec(&TranscriptDocument::new(segments))
        .map_err(|e| InsightsError::AnalysisProcess(format!("failed to encode transcript: {}", e)))?;
    tokio::fs::write(path, document).await.map_err(|e| {
        InsightsError::AnalysisProcess(format!("failed to write transcript to {:?}: {}", path, e))
    })
}
