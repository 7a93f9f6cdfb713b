//! Harness orchestration.
//!
//! Coordinates the live flow: build → precondition check → discovery →
//! one processor run per file → analysis → scoring → corpus report. Files
//! are processed strictly in discovery order, one at a time. Per-file state
//! is folded into a [`SuiteAccumulator`] owned by the calling function; no
//! state outlives a run.
//!
//! Also hosts the offline flow ([`evaluate_directory`]), which analyses and
//! scores artifacts already on disk without invoking the processor.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::analyzer::{self, Analysis};
use crate::artifact::{Artifact, ArtifactError};
use crate::config::Config;
use crate::discovery;
use crate::error::HarnessError;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::report::{
    self, CorpusReport, FileEntry, FileFailure, OfflineEntry, OfflineReport, ReportPaths,
};
use crate::runner::{self, display_name, Invocation, ProcessRunner};
use crate::scorer::{self, Evaluation};

/// Running state of a live suite: the per-file entries seen so far.
pub struct SuiteAccumulator {
    start_time: DateTime<Utc>,
    entries: Vec<FileEntry>,
}

impl SuiteAccumulator {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            entries: Vec::new(),
        }
    }

    /// Fold one invocation in. Successful runs are analysed and scored.
    pub fn record(mut self, invocation: Invocation) -> Self {
        let Invocation { result, artifact } = invocation;
        let (analysis, evaluation) = match artifact.as_ref().map(score_artifact) {
            Some((a, e)) => (Some(a), Some(e)),
            None => (None, None),
        };
        self.entries.push(FileEntry {
            file: result.file_name(),
            run: result,
            analysis,
            evaluation,
        });
        self
    }

    pub fn finish(self, end_time: DateTime<Utc>) -> CorpusReport {
        CorpusReport::build(self.entries, self.start_time, end_time)
    }
}

/// Analyse and score one artifact.
pub fn score_artifact(artifact: &Artifact) -> (Analysis, Evaluation) {
    let analysis = analyzer::analyze(artifact);
    if let Some(anomaly) = analysis.chunk_count_anomaly {
        tracing::warn!(
            file = %analysis.filename,
            reported = anomaly.reported,
            actual = anomaly.actual,
            "processor chunk count disagrees with artifact"
        );
    }
    let evaluation = scorer::evaluate(&analysis);
    (analysis, evaluation)
}

/// Run the live suite and return the corpus report (not yet persisted).
///
/// Returns an error only for run-level faults; per-file failures are
/// recorded in the report.
pub async fn run_suite(
    config: &Config,
    skip_build: bool,
    progress: &dyn ProgressReporter,
) -> Result<CorpusReport, HarnessError> {
    let start_time = Utc::now();

    if !skip_build && config.processor.build.is_some() {
        progress.report(ProgressEvent::Building);
        runner::run_build(&config.processor).await?;
        tracing::info!("processor build succeeded");
    }

    let runner = ProcessRunner::new(&config.processor, &config.paths.results_dir);
    runner.check_executable()?;

    let files = discovery::discover_corpus(&config.paths.corpus_dir)?;
    let total = files.len() as u64;
    progress.report(ProgressEvent::Discovered { total });
    tracing::info!(
        corpus = %config.paths.corpus_dir.display(),
        files = files.len(),
        "corpus discovered"
    );

    let mut acc = SuiteAccumulator::new(start_time);
    for (i, file) in files.iter().enumerate() {
        let name = display_name(file);
        progress.report(ProgressEvent::Processing {
            n: i as u64 + 1,
            total,
            file: name.clone(),
        });

        let invocation = runner.run_file(file).await;
        let result = &invocation.result;
        progress.report(ProgressEvent::Finished {
            file: name,
            ok: result.is_success(),
            seconds: result.processing_time,
            chunks: result.success().map(|s| s.chunks_count),
            message: result.failure().map(|f| f.to_string()),
        });

        acc = acc.record(invocation);
    }

    Ok(acc.finish(Utc::now()))
}

/// Run the live suite and persist both reports under `paths.reports_dir`.
pub async fn run_and_report(
    config: &Config,
    skip_build: bool,
    progress: &dyn ProgressReporter,
) -> Result<(CorpusReport, ReportPaths)> {
    let report = run_suite(config, skip_build, progress).await?;
    let paths = report::write_reports(&report, &config.paths.reports_dir)?;
    Ok((report, paths))
}

/// Offline mode: analyse and score every `*.json` artifact in `dir`.
///
/// A missing directory aborts the pass. An artifact that fails to load is
/// recorded as a [`FileFailure`] and the pass continues.
pub fn evaluate_directory(dir: &Path) -> Result<OfflineReport, HarnessError> {
    let paths = discovery::discover_with(dir, &["json"])?;

    let mut files = Vec::new();
    let mut failures = Vec::new();
    for path in &paths {
        let file = display_name(path);
        match Artifact::load(path) {
            Ok(artifact) => {
                let (analysis, evaluation) = score_artifact(&artifact);
                files.push(OfflineEntry {
                    file,
                    analysis,
                    evaluation,
                });
            }
            Err(err) => {
                tracing::warn!(file = %file, "skipping artifact: {}", err);
                failures.push(FileFailure {
                    file,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(OfflineReport::build(files, failures))
}

/// Analyse and score a single artifact file.
pub fn inspect_artifact(path: &Path) -> Result<(Analysis, Evaluation), ArtifactError> {
    let artifact = Artifact::load(path)?;
    Ok(score_artifact(&artifact))
}
