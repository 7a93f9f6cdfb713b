//! # Chunk Harness CLI (`chq`)
//!
//! The `chq` binary drives an external chunking processor over a corpus and
//! reports on the quality of what it produced.
//!
//! ## Usage
//!
//! ```bash
//! chq --config ./config/harness.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chq run` | Build (optional), process every corpus file, write reports |
//! | `chq evaluate [dir]` | Score existing artifacts without running the processor |
//! | `chq inspect <file>` | Score a single artifact |
//! | `chq discover` | List the corpus files a run would process |
//!
//! ## Exit status
//!
//! `chq run` exits 0 once reports are written, however many files failed.
//! It exits non-zero only when a precondition (build step, missing
//! executable, missing corpus) stops the run before any file is processed.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chunk_harness::config::{self, Config};
use chunk_harness::discovery;
use chunk_harness::harness;
use chunk_harness::progress::ProgressMode;
use chunk_harness::report;

/// Chunk Harness: a quality and regression harness for document-chunking
/// processors.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/harness.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "chq",
    about = "Chunk Harness — quality and regression testing for document-chunking processors",
    version,
    long_about = "Chunk Harness runs an external chunking processor over a corpus of documents, \
    analyses the chunks it produces, scores them for vector-store readiness, and writes \
    corpus-wide JSON and Markdown reports."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/harness.toml")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the processor over the corpus and write reports.
    ///
    /// Files are processed one at a time in name order. Per-file failures
    /// are recorded in the report and do not stop the run.
    Run {
        /// Skip the configured build step.
        #[arg(long)]
        skip_build: bool,

        /// Progress on stderr: `human`, `json`, or `off`.
        /// Defaults to `human` when stderr is a terminal.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Score existing artifacts without invoking the processor.
    Evaluate {
        /// Directory of artifact JSON files. Defaults to `paths.results_dir`.
        dir: Option<PathBuf>,

        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Analyse and score a single artifact.
    Inspect {
        /// Path to an artifact JSON file.
        artifact: PathBuf,

        /// Print analysis and evaluation as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the corpus files a run would process.
    Discover,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            skip_build,
            progress,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let mode = match progress {
                Some(p) => ProgressMode::parse(&p)?,
                None => ProgressMode::default_for_tty(),
            };
            let reporter = mode.reporter();

            let (report, paths) =
                harness::run_and_report(&cfg, skip_build, reporter.as_ref()).await?;

            let s = &report.test_summary;
            println!("run complete");
            println!("  files processed: {}/{}", s.successful, s.total_files);
            println!("  failed: {}", s.failed);
            println!("  total time: {:.2}s", s.total_time);
            println!(
                "  success rate: {:.1}%",
                report.quality_metrics.success_rate
            );
            if let Some(scoring) = &report.scoring {
                println!(
                    "  average score: {:.1}/10 ({:.1}%)",
                    scoring.mean_score, scoring.mean_percentage
                );
            }
            println!("  json report: {}", paths.json.display());
            println!("  markdown report: {}", paths.markdown.display());
        }
        Commands::Evaluate { dir, json, output } => {
            // Use config if available, otherwise defaults
            let cfg = config::load_config(&cli.config).unwrap_or_else(|_| Config::minimal());
            let dir = dir.unwrap_or(cfg.paths.results_dir);

            let report = harness::evaluate_directory(&dir)?;
            let rendered_json = serde_json::to_string_pretty(&report)?;

            if let Some(path) = &output {
                report::write_atomically(&[(path.as_path(), rendered_json.clone())])?;
                eprintln!("Wrote evaluation to {}", path.display());
            }
            if json {
                println!("{}", rendered_json);
            } else {
                print!("{}", report::render_offline_text(&report));
            }
        }
        Commands::Inspect { artifact, json } => {
            let (analysis, evaluation) = harness::inspect_artifact(&artifact)?;
            if json {
                let value = serde_json::json!({
                    "analysis": analysis,
                    "evaluation": evaluation,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                let name = artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                print!("{}", report::render_entry_text(&name, &analysis, &evaluation));
            }
        }
        Commands::Discover => {
            let cfg = config::load_config(&cli.config)?;
            let files = discovery::discover_corpus(&cfg.paths.corpus_dir)?;
            for file in &files {
                println!("{}", file.display());
            }
            eprintln!("{} corpus files", files.len());
        }
    }

    Ok(())
}
