//! External processor invocation.
//!
//! [`ProcessRunner`] runs the chunking processor once per input file:
//!
//! ```text
//! <executable> [leading_args…] --input <file> --output <results>/<stem>_output.json
//!              --chunk-size <n> --chunk-overlap <n> [--detect-language] [--pretty]
//! ```
//!
//! Each call is a bounded wait. The child is spawned with captured stdout
//! and stderr and `kill_on_drop`, then awaited under `tokio::time::timeout`;
//! if the deadline passes the wait future is dropped, which kills the child.
//!
//! The outcome is always a [`RunResult`]. Per-file problems (non-zero exit,
//! timeout, missing or unparsable output, launch failure) become a
//! [`RunFailure`] and never abort the batch. Only batch preconditions
//! ([`ProcessRunner::check_executable`], [`run_build`]) return
//! [`HarnessError`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::artifact::{Artifact, DocumentMetadata};
use crate::config::ProcessorConfig;
use crate::error::HarnessError;

/// Outcome of one processor invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub input_file: PathBuf,
    /// Wall-clock seconds from spawn to completion (or deadline).
    pub processing_time: f64,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success(RunSuccess),
    Failure(RunFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSuccess {
    pub output_file: PathBuf,
    pub file_size: u64,
    pub chunks_count: usize,
    pub total_words: u64,
    pub document_metadata: DocumentMetadata,
    pub stdout: String,
    pub stderr: String,
}

/// Why a single file could not be processed.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    #[error("processing timeout after {}s", *timeout_ms as f64 / 1000.0)]
    Timeout { timeout_ms: u64 },

    #[error("{}", failure_text(stderr, *code))]
    NonZeroExit {
        code: Option<i32>,
        stderr: String,
        stdout: String,
    },

    #[error("processor exited successfully but wrote no output at {}", path.display())]
    MissingOutput {
        path: PathBuf,
        stderr: String,
        stdout: String,
    },

    #[error("unreadable output: {reason}")]
    UnreadableOutput { reason: String },

    #[error("failed to launch processor: {reason}")]
    Launch { reason: String },
}

fn failure_text(stderr: &str, code: Option<i32>) -> String {
    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    match code {
        Some(code) => format!("processor exited with code {}", code),
        None => "processor terminated by signal".to_string(),
    }
}

impl RunFailure {
    /// The processor's exit code, when it ran to completion.
    pub fn return_code(&self) -> Option<i32> {
        match self {
            RunFailure::NonZeroExit { code, .. } => *code,
            RunFailure::MissingOutput { .. } => Some(0),
            _ => None,
        }
    }
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Success(_))
    }

    pub fn success(&self) -> Option<&RunSuccess> {
        match &self.outcome {
            RunOutcome::Success(s) => Some(s),
            RunOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.outcome {
            RunOutcome::Success(_) => None,
            RunOutcome::Failure(f) => Some(f),
        }
    }

    pub fn file_name(&self) -> String {
        display_name(&self.input_file)
    }
}

/// A [`RunResult`] together with the artifact it loaded, if any.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub result: RunResult,
    pub artifact: Option<Artifact>,
}

pub struct ProcessRunner {
    executable: PathBuf,
    leading_args: Vec<String>,
    results_dir: PathBuf,
    timeout: Duration,
    chunk_size: usize,
    chunk_overlap: usize,
    detect_language: bool,
    pretty: bool,
}

impl ProcessRunner {
    pub fn new(config: &ProcessorConfig, results_dir: &Path) -> Self {
        Self {
            executable: config.executable.clone(),
            leading_args: config.leading_args.clone(),
            results_dir: results_dir.to_path_buf(),
            timeout: Duration::from_secs(config.timeout_secs),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            detect_language: config.detect_language,
            pretty: config.pretty,
        }
    }

    /// Override the per-file deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Batch precondition: the processor must exist before any file runs.
    pub fn check_executable(&self) -> Result<(), HarnessError> {
        if self.executable.is_file() {
            Ok(())
        } else {
            Err(HarnessError::MissingExecutable(self.executable.clone()))
        }
    }

    /// Where the artifact for `input` is written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        self.results_dir.join(format!("{}_output.json", stem))
    }

    /// Full argument list for one input, excluding the executable.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend([
            "--input".to_string(),
            input.to_string_lossy().to_string(),
            "--output".to_string(),
            output.to_string_lossy().to_string(),
            "--chunk-size".to_string(),
            self.chunk_size.to_string(),
            "--chunk-overlap".to_string(),
            self.chunk_overlap.to_string(),
        ]);
        if self.detect_language {
            args.push("--detect-language".to_string());
        }
        if self.pretty {
            args.push("--pretty".to_string());
        }
        args
    }

    /// Run the processor on one input file.
    pub async fn run_file(&self, input: &Path) -> Invocation {
        let output_file = self.output_path(input);
        let start = Instant::now();

        let outcome = self.invoke(input, &output_file).await;
        let processing_time = start.elapsed().as_secs_f64();

        let (outcome, artifact) = match outcome {
            Ok((success, artifact)) => (RunOutcome::Success(success), Some(artifact)),
            Err(failure) => {
                tracing::debug!(file = %input.display(), "processor run failed: {}", failure);
                (RunOutcome::Failure(failure), None)
            }
        };

        Invocation {
            result: RunResult {
                input_file: input.to_path_buf(),
                processing_time,
                outcome,
            },
            artifact,
        }
    }

    async fn invoke(
        &self,
        input: &Path,
        output_file: &Path,
    ) -> Result<(RunSuccess, Artifact), RunFailure> {
        std::fs::create_dir_all(&self.results_dir).map_err(|e| RunFailure::Launch {
            reason: format!(
                "cannot create results directory {}: {}",
                self.results_dir.display(),
                e
            ),
        })?;

        // A leftover artifact from an earlier run must not pass for this one.
        if output_file.exists() {
            std::fs::remove_file(output_file).map_err(|e| RunFailure::Launch {
                reason: format!("cannot remove stale output {}: {}", output_file.display(), e),
            })?;
        }

        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args(input, output_file))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| RunFailure::Launch {
            reason: e.to_string(),
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(RunFailure::Launch {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RunFailure::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(RunFailure::NonZeroExit {
                code: output.status.code(),
                stderr,
                stdout,
            });
        }

        if !output_file.exists() {
            return Err(RunFailure::MissingOutput {
                path: output_file.to_path_buf(),
                stderr,
                stdout,
            });
        }

        let artifact = Artifact::load(output_file).map_err(|e| RunFailure::UnreadableOutput {
            reason: e.to_string(),
        })?;

        let file_size = match std::fs::metadata(input) {
            Ok(meta) => meta.len(),
            Err(err) => {
                tracing::warn!(
                    file = %input.display(),
                    "cannot read input size, reporting 0 bytes: {}",
                    err
                );
                0
            }
        };

        let success = RunSuccess {
            output_file: output_file.to_path_buf(),
            file_size,
            chunks_count: artifact.chunks.len(),
            total_words: artifact.total_words(),
            document_metadata: artifact.document_metadata.clone(),
            stdout,
            stderr,
        };
        Ok((success, artifact))
    }
}

/// Run the optional one-off build command. Any failure aborts the run.
pub async fn run_build(config: &ProcessorConfig) -> Result<(), HarnessError> {
    let Some(argv) = config.build.as_ref() else {
        return Ok(());
    };
    let Some((program, rest)) = argv.split_first() else {
        return Ok(());
    };

    let mut cmd = Command::new(program);
    cmd.args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &config.build_dir {
        cmd.current_dir(dir);
    }

    let child = cmd.spawn().map_err(|source| HarnessError::BuildLaunch {
        command: argv.join(" "),
        source,
    })?;

    let timeout = Duration::from_secs(config.build_timeout_secs);
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(HarnessError::BuildLaunch {
                command: argv.join(" "),
                source,
            })
        }
        Err(_) => return Err(HarnessError::BuildTimeout(config.build_timeout_secs)),
    };

    if !output.status.success() {
        return Err(HarnessError::BuildFailed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GOOD_SCRIPT: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
  esac
  shift
done
cat > "$out" <<'EOF'
{
  "document_metadata": {"filename": "in.txt", "document_type": "TXT", "file_size": 11},
  "processing_info": {"total_chunks": 2, "processing_time_ms": 4, "total_content_size": 1600},
  "chunks": [
    {"content": "hello brave new world", "metadata": {"size": 800, "language": "en", "confidence": 0.9, "format_specific": {"word_count": 4}}},
    {"content": "second chunk", "metadata": {"size": 800, "language": "en", "confidence": 0.9, "format_specific": {"word_count": 2}}}
  ]
}
EOF
echo processed
"#;

    /// Runner that executes `script` through `/bin/sh`.
    fn sh_runner(tmp: &TempDir, script: &str) -> ProcessRunner {
        let script_path = tmp.path().join("processor.sh");
        fs::write(&script_path, script).unwrap();
        let config = ProcessorConfig {
            executable: PathBuf::from("/bin/sh"),
            leading_args: vec![script_path.to_string_lossy().to_string()],
            timeout_secs: 10,
            ..ProcessorConfig::default()
        };
        ProcessRunner::new(&config, &tmp.path().join("results"))
    }

    fn input(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("in.txt");
        fs::write(&path, "hello world").unwrap();
        path
    }

    #[test]
    fn test_output_path_and_args() {
        let config = ProcessorConfig::default();
        let runner = ProcessRunner::new(&config, Path::new("/results"));
        let out = runner.output_path(Path::new("/corpus/report.pdf"));
        assert_eq!(out, PathBuf::from("/results/report_output.json"));

        let args = runner.args(Path::new("/corpus/report.pdf"), &out);
        assert_eq!(
            args,
            vec![
                "--input",
                "/corpus/report.pdf",
                "--output",
                "/results/report_output.json",
                "--chunk-size",
                "1200",
                "--chunk-overlap",
                "120",
                "--detect-language",
                "--pretty",
            ]
        );
    }

    #[test]
    fn test_missing_executable_is_config_fault() {
        let config = ProcessorConfig {
            executable: PathBuf::from("/no/such/processor"),
            ..ProcessorConfig::default()
        };
        let runner = ProcessRunner::new(&config, Path::new("/tmp"));
        assert!(matches!(
            runner.check_executable(),
            Err(HarnessError::MissingExecutable(_))
        ));
    }

    #[tokio::test]
    async fn test_success_loads_artifact() {
        let tmp = TempDir::new().unwrap();
        let runner = sh_runner(&tmp, GOOD_SCRIPT);
        let inv = runner.run_file(&input(&tmp)).await;

        let success = inv.result.success().expect("run should succeed");
        assert_eq!(success.chunks_count, 2);
        assert_eq!(success.total_words, 6);
        assert_eq!(success.file_size, 11);
        assert!(success.stdout.contains("processed"));
        assert!(success.output_file.ends_with("in_output.json"));
        assert_eq!(inv.artifact.unwrap().chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_vanished_input_reports_zero_size() {
        let tmp = TempDir::new().unwrap();
        // Same processor, but it deletes its input before writing output.
        let script = GOOD_SCRIPT.replace(
            "    --output)",
            "    --input) rm -f \"$2\"; shift ;;\n    --output)",
        );
        let runner = sh_runner(&tmp, &script);
        let input = input(&tmp);
        let inv = runner.run_file(&input).await;

        assert!(!input.exists());
        let success = inv.result.success().expect("run should still succeed");
        assert_eq!(success.file_size, 0);
        assert_eq!(success.chunks_count, 2);
    }

    #[tokio::test]
    async fn test_non_zero_exit_carries_stderr_and_code() {
        let tmp = TempDir::new().unwrap();
        let runner = sh_runner(&tmp, "echo 'unsupported format' >&2\nexit 3\n");
        let inv = runner.run_file(&input(&tmp)).await;

        let failure = inv.result.failure().expect("run should fail");
        assert_eq!(failure.return_code(), Some(3));
        assert_eq!(failure.to_string(), "unsupported format");
        assert!(inv.artifact.is_none());
    }

    #[tokio::test]
    async fn test_exit_zero_without_output_fails() {
        let tmp = TempDir::new().unwrap();
        let runner = sh_runner(&tmp, "exit 0\n");
        let inv = runner.run_file(&input(&tmp)).await;
        assert!(matches!(
            inv.result.failure(),
            Some(RunFailure::MissingOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_output_is_not_reused() {
        let tmp = TempDir::new().unwrap();
        let good = sh_runner(&tmp, GOOD_SCRIPT);
        let input = input(&tmp);
        assert!(good.run_file(&input).await.result.is_success());

        let silent = sh_runner(&tmp, "exit 0\n");
        let inv = silent.run_file(&input).await;
        assert!(!inv.result.is_success());
    }

    #[tokio::test]
    async fn test_unparsable_output_fails() {
        let tmp = TempDir::new().unwrap();
        let script = r#"
while [ $# -gt 0 ]; do
  case "$1" in --output) out="$2"; shift ;; esac
  shift
done
echo '{"chunks": "nope"}' > "$out"
"#;
        let runner = sh_runner(&tmp, script);
        let inv = runner.run_file(&input(&tmp)).await;
        assert!(matches!(
            inv.result.failure(),
            Some(RunFailure::UnreadableOutput { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_returns_promptly() {
        let tmp = TempDir::new().unwrap();
        let runner = sh_runner(&tmp, "sleep 30\n").with_timeout(Duration::from_millis(300));

        let start = Instant::now();
        let inv = runner.run_file(&input(&tmp)).await;
        assert!(start.elapsed() < Duration::from_secs(10));

        let failure = inv.result.failure().expect("run should time out");
        assert!(matches!(failure, RunFailure::Timeout { timeout_ms: 300 }));
        assert_eq!(failure.to_string(), "processing timeout after 0.3s");
    }

    #[tokio::test]
    async fn test_launch_error_is_per_file() {
        let tmp = TempDir::new().unwrap();
        let config = ProcessorConfig {
            executable: tmp.path().join("missing-bin"),
            ..ProcessorConfig::default()
        };
        let runner = ProcessRunner::new(&config, &tmp.path().join("results"));
        let inv = runner.run_file(&input(&tmp)).await;
        assert!(matches!(
            inv.result.failure(),
            Some(RunFailure::Launch { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_failure_aborts() {
        let config = ProcessorConfig {
            build: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "echo broken >&2; exit 1".to_string(),
            ]),
            ..ProcessorConfig::default()
        };
        match run_build(&config).await {
            Err(HarnessError::BuildFailed { code, stderr }) => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected build failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_build_command_is_noop() {
        run_build(&ProcessorConfig::default()).await.unwrap();
    }
}
