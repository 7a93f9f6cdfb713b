//! Corpus-wide aggregation and report rendering.
//!
//! Two report shapes exist because the two modes measure time differently:
//!
//! - [`CorpusReport`] for `chq run`: wall-clock **seconds** measured by the
//!   runner around each processor invocation.
//! - [`OfflineReport`] for `chq evaluate`: processor-reported
//!   **milliseconds** read from existing artifacts.
//!
//! Both share [`ScoreSummary`]: mean score and throughput, best/worst file
//! (first encountered wins ties), and the most frequent recommendations.
//!
//! Persisted live reports go through [`write_reports`], which writes every
//! rendering to a temp file in the reports directory before renaming any of
//! them into place.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::analyzer::Analysis;
use crate::runner::RunResult;
use crate::scorer::{Evaluation, MAX_SCORE};
use crate::stats::{self, format_bytes, format_number};

pub const JSON_REPORT_FILE: &str = "test_results_detailed.json";
pub const MARKDOWN_REPORT_FILE: &str = "TEST_SUITE_REPORT.md";

/// How many recommendations surface as corpus-wide guidance.
pub const TOP_RECOMMENDATIONS: usize = 3;

// ─── Shared scoring aggregates ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedFile {
    pub file: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationCount {
    pub recommendation: String,
    /// Number of files whose evaluation carries this recommendation.
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub files_evaluated: usize,
    pub mean_score: f64,
    pub mean_percentage: f64,
    pub mean_chars_per_ms: f64,
    pub best: RankedFile,
    pub worst: RankedFile,
    pub top_recommendations: Vec<RecommendationCount>,
}

impl ScoreSummary {
    /// Aggregate `(file, analysis, evaluation)` triples in discovery order.
    /// Returns `None` when nothing was evaluated.
    pub fn from_scored<'a, I>(scored: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Analysis, &'a Evaluation)>,
    {
        let scored: Vec<_> = scored.into_iter().collect();
        let (best, worst) = best_and_worst(scored.iter().map(|(f, _, e)| (*f, e.score)))?;

        let scores: Vec<f64> = scored.iter().map(|(_, _, e)| e.score).collect();
        let throughput: Vec<f64> = scored
            .iter()
            .map(|(_, a, _)| a.performance.chars_per_ms)
            .collect();
        let mean_score = stats::mean(&scores);

        Some(Self {
            files_evaluated: scored.len(),
            mean_score,
            mean_percentage: mean_score / MAX_SCORE * 100.0,
            mean_chars_per_ms: stats::mean(&throughput),
            best,
            worst,
            top_recommendations: top_recommendations(
                scored.iter().map(|(_, _, e)| *e),
                TOP_RECOMMENDATIONS,
            ),
        })
    }
}

/// First maximum and first minimum by score.
pub fn best_and_worst<'a, I>(scores: I) -> Option<(RankedFile, RankedFile)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut iter = scores.into_iter();
    let (file, score) = iter.next()?;
    let mut best = (file, score);
    let mut worst = (file, score);

    for (file, score) in iter {
        if score > best.1 {
            best = (file, score);
        }
        if score < worst.1 {
            worst = (file, score);
        }
    }

    Some((
        RankedFile {
            file: best.0.to_string(),
            score: best.1,
        },
        RankedFile {
            file: worst.0.to_string(),
            score: worst.1,
        },
    ))
}

/// Pool recommendations across evaluations and keep the `limit` most
/// frequent. Equal counts keep first-appearance order.
pub fn top_recommendations<'a, I>(evaluations: I, limit: usize) -> Vec<RecommendationCount>
where
    I: IntoIterator<Item = &'a Evaluation>,
{
    let mut counts: Vec<RecommendationCount> = Vec::new();
    for eval in evaluations {
        for rec in &eval.recommendations {
            match counts.iter_mut().find(|c| &c.recommendation == rec) {
                Some(entry) => entry.files += 1,
                None => counts.push(RecommendationCount {
                    recommendation: rec.clone(),
                    files: 1,
                }),
            }
        }
    }
    // Stable sort preserves first-appearance order among ties.
    counts.sort_by(|a, b| b.files.cmp(&a.files));
    counts.truncate(limit);
    counts
}

// ─── Live run report ────────────────────────────────────────────────

/// One processed corpus file: the run plus, on success, its scoring.
#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub file: String,
    pub run: RunResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    /// Sum of per-file wall-clock seconds, failures included.
    pub total_time: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Aggregates over successful runs. Times in seconds.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub avg_processing_time: f64,
    pub max_processing_time: f64,
    pub min_processing_time: f64,
    pub avg_chunks_per_file: f64,
    pub total_chunks_generated: u64,
    pub avg_words_per_file: f64,
    pub total_words_processed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityMetrics {
    /// Percentage of corpus files processed successfully.
    pub success_rate: f64,
    /// Words per second over the whole run.
    pub processing_efficiency: f64,
    /// Words per chunk across successful runs.
    pub average_chunk_size: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusReport {
    pub test_summary: TestSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_stats: Option<PerformanceStats>,
    pub quality_metrics: QualityMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoreSummary>,
    pub file_results: Vec<FileEntry>,
}

impl CorpusReport {
    pub fn build(files: Vec<FileEntry>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        let total_files = files.len();
        let successful = files.iter().filter(|f| f.run.is_success()).count();
        let total_time: f64 = files.iter().map(|f| f.run.processing_time).sum();

        let ok: Vec<_> = files
            .iter()
            .filter_map(|f| f.run.success().map(|s| (f.run.processing_time, s)))
            .collect();

        let total_chunks: u64 = ok.iter().map(|(_, s)| s.chunks_count as u64).sum();
        let total_words: u64 = ok.iter().map(|(_, s)| s.total_words).sum();

        let performance_stats = if ok.is_empty() {
            None
        } else {
            let times: Vec<f64> = ok.iter().map(|(t, _)| *t).collect();
            let summary = stats::Summary::of(&times);
            Some(PerformanceStats {
                avg_processing_time: summary.mean,
                max_processing_time: summary.max,
                min_processing_time: summary.min,
                avg_chunks_per_file: total_chunks as f64 / ok.len() as f64,
                total_chunks_generated: total_chunks,
                avg_words_per_file: total_words as f64 / ok.len() as f64,
                total_words_processed: total_words,
            })
        };

        let quality_metrics = QualityMetrics {
            success_rate: stats::ratio(successful as f64, total_files as f64) * 100.0,
            processing_efficiency: stats::ratio(total_words as f64, total_time),
            average_chunk_size: stats::ratio(total_words as f64, total_chunks as f64),
        };

        let scoring = ScoreSummary::from_scored(files.iter().filter_map(|f| {
            match (&f.analysis, &f.evaluation) {
                (Some(a), Some(e)) => Some((f.file.as_str(), a, e)),
                _ => None,
            }
        }));

        Self {
            test_summary: TestSummary {
                total_files,
                successful,
                failed: total_files - successful,
                total_time,
                start_time,
                end_time,
            },
            performance_stats,
            quality_metrics,
            scoring,
            file_results: files,
        }
    }
}

/// Narrative report for a live run.
pub fn render_markdown(report: &CorpusReport) -> String {
    let s = &report.test_summary;
    let mut out = String::new();

    out.push_str("# Chunk Harness Test Suite Report\n\n");
    out.push_str(&format!(
        "**Generated:** {}  \n",
        s.end_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("**Test Duration:** {:.2} seconds\n\n", s.total_time));

    out.push_str("## Summary\n\n");
    out.push_str(&format!("- **Total Files Tested:** {}\n", s.total_files));
    out.push_str(&format!("- **Successful Processes:** {} ✅\n", s.successful));
    out.push_str(&format!("- **Failed Processes:** {} ❌\n", s.failed));
    out.push_str(&format!(
        "- **Success Rate:** {:.1}%\n\n",
        report.quality_metrics.success_rate
    ));

    out.push_str("## Performance Metrics\n\n");
    match &report.performance_stats {
        Some(p) => {
            let q = &report.quality_metrics;
            out.push_str(&format!(
                "- **Average Processing Time:** {:.2}s\n",
                p.avg_processing_time
            ));
            out.push_str(&format!(
                "- **Processing Range:** {:.2}s - {:.2}s\n",
                p.min_processing_time, p.max_processing_time
            ));
            out.push_str(&format!(
                "- **Total Chunks Generated:** {}\n",
                format_number(p.total_chunks_generated)
            ));
            out.push_str(&format!(
                "- **Average Chunks per File:** {:.1}\n",
                p.avg_chunks_per_file
            ));
            out.push_str(&format!(
                "- **Total Words Processed:** {}\n",
                format_number(p.total_words_processed)
            ));
            out.push_str(&format!(
                "- **Processing Efficiency:** {:.0} words/second\n",
                q.processing_efficiency
            ));
            out.push_str(&format!(
                "- **Average Chunk Size:** {:.0} words\n\n",
                q.average_chunk_size
            ));
        }
        None => out.push_str("No file was processed successfully.\n\n"),
    }

    if let Some(scoring) = &report.scoring {
        out.push_str("## Vector Store Readiness\n\n");
        push_score_summary(&mut out, scoring);
        out.push('\n');
    }

    out.push_str("## File Processing Results\n\n");
    for entry in &report.file_results {
        let run = &entry.run;
        match run.success() {
            Some(ok) => {
                out.push_str(&format!("### ✅ {}\n\n", entry.file));
                out.push_str(&format!(
                    "- **Processing Time:** {:.2}s\n",
                    run.processing_time
                ));
                out.push_str(&format!(
                    "- **File Size:** {} ({} bytes)\n",
                    format_bytes(ok.file_size),
                    format_number(ok.file_size)
                ));
                out.push_str(&format!("- **Chunks Generated:** {}\n", ok.chunks_count));
                out.push_str(&format!(
                    "- **Words Processed:** {}\n",
                    format_number(ok.total_words)
                ));
                let output_name = ok
                    .output_file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                out.push_str(&format!("- **Output File:** `{}`\n", output_name));
                if let Some(eval) = &entry.evaluation {
                    out.push_str(&format!(
                        "- **Quality:** {} {} ({:.1}/{})\n",
                        eval.indicator,
                        eval.tier.label(),
                        eval.score,
                        eval.max_score
                    ));
                    for criterion in &eval.criteria {
                        out.push_str(&format!("  - {}\n", criterion));
                    }
                    if !eval.recommendations.is_empty() {
                        out.push_str("- **Recommendations:**\n");
                        for rec in &eval.recommendations {
                            out.push_str(&format!("  - {}\n", rec));
                        }
                    }
                }
                if let Some(anomaly) = entry.analysis.as_ref().and_then(|a| a.chunk_count_anomaly) {
                    out.push_str(&format!(
                        "- **Chunk Count Anomaly:** processor reported {}, artifact holds {}\n",
                        anomaly.reported, anomaly.actual
                    ));
                }
                out.push('\n');
            }
            None => {
                let failure = run.failure();
                out.push_str(&format!("### ❌ {}\n\n", entry.file));
                out.push_str(&format!(
                    "- **Error:** {}\n",
                    failure
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| "Unknown error".to_string())
                ));
                out.push_str(&format!(
                    "- **Processing Time:** {:.2}s\n",
                    run.processing_time
                ));
                out.push_str(&format!(
                    "- **Return Code:** {}\n\n",
                    failure
                        .and_then(|f| f.return_code())
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "N/A".to_string())
                ));
            }
        }
    }

    out.push_str(CLOSING_SECTION);
    out
}

const CLOSING_SECTION: &str = "## Quality Assessment

The test suite validates:
- ✅ File format compatibility
- ✅ Processing reliability
- ✅ Output consistency
- ✅ Performance benchmarks
- ✅ Error handling

## Recommendations

Based on test results:
1. **Production Ready:** Success rate indicates reliable processing
2. **Performance:** Efficient processing across different file types
3. **Scalability:** Consistent performance with varying file sizes
4. **Quality:** Generated chunks maintain content integrity

---
*Report generated by the chunk-harness automated test suite*
";

fn push_score_summary(out: &mut String, scoring: &ScoreSummary) {
    out.push_str(&format!(
        "- **Average Score:** {:.1}/{} ({:.1}%)\n",
        scoring.mean_score, MAX_SCORE, scoring.mean_percentage
    ));
    out.push_str(&format!(
        "- **Average Throughput:** {:.1} chars/ms\n",
        scoring.mean_chars_per_ms
    ));
    out.push_str(&format!(
        "- **Best Result:** {} ({:.1}/{})\n",
        scoring.best.file, scoring.best.score, MAX_SCORE
    ));
    out.push_str(&format!(
        "- **Needs Most Work:** {} ({:.1}/{})\n",
        scoring.worst.file, scoring.worst.score, MAX_SCORE
    ));
    if !scoring.top_recommendations.is_empty() {
        out.push_str("- **Top Recommendations:**\n");
        for rec in &scoring.top_recommendations {
            out.push_str(&format!(
                "  - {} (affects {} file{})\n",
                rec.recommendation,
                rec.files,
                if rec.files == 1 { "" } else { "s" }
            ));
        }
    }
}

/// Paths the live reports were written to.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Persist both live renderings under `reports_dir`.
pub fn write_reports(report: &CorpusReport, reports_dir: &Path) -> Result<ReportPaths> {
    let json = serde_json::to_string_pretty(report)?;
    let markdown = render_markdown(report);

    let paths = ReportPaths {
        json: reports_dir.join(JSON_REPORT_FILE),
        markdown: reports_dir.join(MARKDOWN_REPORT_FILE),
    };
    write_atomically(&[(paths.json.as_path(), json), (paths.markdown.as_path(), markdown)])?;
    Ok(paths)
}

/// Write every `(path, contents)` pair to a sibling temp file, then rename
/// each into place.
///
/// A failure while staging leaves every existing file intact. The renames
/// themselves run one after another, so a failure on a later rename leaves
/// earlier targets already replaced; each file is still whole, but a pair of
/// renderings can then come from different runs.
pub fn write_atomically(files: &[(&Path, String)]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        staged.push((tmp, *path));
    }

    for (tmp, path) in staged {
        tmp.persist(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

// ─── Offline evaluation report ──────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OfflineEntry {
    pub file: String,
    pub analysis: Analysis,
    pub evaluation: Evaluation,
}

/// An artifact that could not be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// Offline aggregates. Times in milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct OfflineSummary {
    pub total_chunks: u64,
    pub total_processing_time_ms: f64,
    #[serde(flatten)]
    pub scores: ScoreSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfflineReport {
    pub files: Vec<OfflineEntry>,
    pub failures: Vec<FileFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<OfflineSummary>,
}

impl OfflineReport {
    pub fn build(files: Vec<OfflineEntry>, failures: Vec<FileFailure>) -> Self {
        let summary = ScoreSummary::from_scored(
            files
                .iter()
                .map(|f| (f.file.as_str(), &f.analysis, &f.evaluation)),
        )
        .map(|scores| OfflineSummary {
            total_chunks: files.iter().map(|f| f.analysis.chunks.count as u64).sum(),
            total_processing_time_ms: files.iter().map(|f| f.analysis.processing_time_ms).sum(),
            scores,
        });

        Self {
            files,
            failures,
            summary,
        }
    }
}

/// Console rendering of an offline evaluation.
pub fn render_offline_text(report: &OfflineReport) -> String {
    let mut out = String::new();
    out.push_str("Chunk Harness — Artifact Quality Evaluation\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');

    for entry in &report.files {
        push_entry_text(&mut out, &entry.file, &entry.analysis, &entry.evaluation);
    }

    for failure in &report.failures {
        out.push_str(&format!("\n{}\n", failure.file));
        out.push_str(&"-".repeat(40));
        out.push('\n');
        out.push_str(&format!("  error: {}\n", failure.message));
    }

    if let Some(summary) = &report.summary {
        out.push('\n');
        out.push_str(&"=".repeat(60));
        out.push_str("\nOverall\n");
        out.push_str(&"=".repeat(60));
        out.push('\n');
        out.push_str(&format!(
            "  Files evaluated:     {} ({} failed)\n",
            summary.scores.files_evaluated,
            report.failures.len()
        ));
        out.push_str(&format!(
            "  Total chunks:        {}\n",
            format_number(summary.total_chunks)
        ));
        out.push_str(&format!(
            "  Total processing:    {:.0} ms\n",
            summary.total_processing_time_ms
        ));
        let mut md = String::new();
        push_score_summary(&mut md, &summary.scores);
        for line in md.lines() {
            out.push_str(&format!("  {}\n", line.replace("**", "")));
        }
    } else if !report.failures.is_empty() {
        out.push_str(&format!(
            "\nNo artifact could be evaluated ({} failed).\n",
            report.failures.len()
        ));
    } else {
        out.push_str("\nNo artifacts found.\n");
    }

    out
}

/// Per-artifact console block, shared by `evaluate` and `inspect`.
pub fn render_entry_text(file: &str, analysis: &Analysis, evaluation: &Evaluation) -> String {
    let mut out = String::new();
    push_entry_text(&mut out, file, analysis, evaluation);
    out
}

fn push_entry_text(out: &mut String, file: &str, a: &Analysis, e: &Evaluation) {
    let q = &a.vector_store_quality;
    out.push_str(&format!("\n{}\n", file));
    out.push_str(&"-".repeat(40));
    out.push('\n');
    out.push_str(&format!("  Type:              {}\n", a.document_type));
    out.push_str(&format!(
        "  File size:         {} bytes\n",
        format_number(a.file_size)
    ));
    out.push_str(&format!(
        "  Chunks:            {}\n",
        format_number(a.chunks.count as u64)
    ));
    out.push_str(&format!(
        "  Processing time:   {} ms\n",
        a.processing_time_ms
    ));
    out.push_str(&format!(
        "  Throughput:        {:.1} chars/ms\n",
        a.performance.chars_per_ms
    ));
    out.push_str(&format!(
        "  Chunk size:        mean {:.1}, median {:.1}, std dev {:.1}\n",
        a.chunks.size.mean, a.chunks.size.median, a.chunks.size.std_dev
    ));
    out.push_str(&format!(
        "  Words per chunk:   {:.1}\n",
        a.chunks.avg_word_count
    ));
    out.push_str(&format!(
        "  Optimal chunks:    {:.1}%\n",
        q.optimal_size_ratio * 100.0
    ));
    out.push_str(&format!(
        "  Content variety:   {:.1}%\n",
        q.content_variety * 100.0
    ));
    out.push_str(&format!(
        "  Metadata richness: {:.1}%\n",
        q.metadata_richness * 100.0
    ));
    if let Some(anomaly) = a.chunk_count_anomaly {
        out.push_str(&format!(
            "  Warning:           processor reported {} chunks, artifact holds {}\n",
            anomaly.reported, anomaly.actual
        ));
    }
    out.push_str(&format!(
        "  {} {}: {:.1}/{} ({:.1}%)\n",
        e.indicator,
        e.tier.label(),
        e.score,
        e.max_score,
        e.percentage
    ));
    for criterion in &e.criteria {
        out.push_str(&format!("    {}\n", criterion));
    }
    for rec in &e.recommendations {
        out.push_str(&format!("    - {}\n", rec));
    }
}
