//! Harness progress reporting.
//!
//! Reports observable progress during `chq run` so users see which file is
//! being processed and how it went. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts.

use std::io::Write;

use crate::stats::format_number;

/// A single progress event for a harness run.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// The processor build step started.
    Building,
    /// Corpus discovery finished.
    Discovered { total: u64 },
    /// File `n` of `total` is about to be handed to the processor.
    Processing { n: u64, total: u64, file: String },
    /// The processor finished (or failed) on a file.
    Finished {
        file: String,
        ok: bool,
        seconds: f64,
        chunks: Option<usize>,
        message: Option<String>,
    },
}

/// Reports harness progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the harness loop.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "run  [3/12] report.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Building => "run  building processor...\n".to_string(),
            ProgressEvent::Discovered { total } => {
                format!("run  found {} corpus files\n", format_number(*total))
            }
            ProgressEvent::Processing { n, total, file } => {
                format!("run  [{}/{}] {}\n", n, total, file)
            }
            ProgressEvent::Finished {
                ok: true,
                seconds,
                chunks,
                ..
            } => format!(
                "       ok ({:.2}s, {} chunks)\n",
                seconds,
                chunks.unwrap_or(0)
            ),
            ProgressEvent::Finished {
                ok: false, message, ..
            } => format!(
                "       failed: {}\n",
                message.as_deref().unwrap_or("unknown error")
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Building => serde_json::json!({
                "event": "progress",
                "phase": "building"
            }),
            ProgressEvent::Discovered { total } => serde_json::json!({
                "event": "progress",
                "phase": "discovered",
                "total": total
            }),
            ProgressEvent::Processing { n, total, file } => serde_json::json!({
                "event": "progress",
                "phase": "processing",
                "n": n,
                "total": total,
                "file": file
            }),
            ProgressEvent::Finished {
                file,
                ok,
                seconds,
                chunks,
                message,
            } => serde_json::json!({
                "event": "progress",
                "phase": "finished",
                "file": file,
                "ok": ok,
                "seconds": seconds,
                "chunks": chunks,
                "message": message
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => anyhow::bail!("Unknown progress mode: '{}'. Use off, human, or json.", other),
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
