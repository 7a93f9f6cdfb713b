//! # Chunk Harness
//!
//! A quality and regression harness for external document-chunking
//! processors.
//!
//! Chunk Harness drives a chunking executable over a corpus of documents,
//! collects the JSON artifact it writes for each input, computes
//! distributional statistics over the resulting chunks, and scores each
//! artifact for vector-store readiness. Per-file results roll up into a
//! corpus-wide report in both JSON and Markdown.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌────────┐   ┌──────────┐
//! │ Discovery │──▶│  Runner   │──▶│ Analyzer │──▶│ Scorer │──▶│  Report  │
//! │  corpus/  │   │ processor │   │  stats   │   │  0-10  │   │ JSON+MD  │
//! └───────────┘   └───────────┘   └──────────┘   └────────┘   └──────────┘
//!                                      ▲
//!                      results/*.json ─┘  (offline: `chq evaluate`)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chq discover                      # list corpus files
//! chq run                           # process corpus, write reports
//! chq evaluate testing/results      # score existing artifacts
//! chq inspect report_output.json    # score one artifact
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`artifact`] | Processor output schema |
//! | [`discovery`] | Corpus file discovery |
//! | [`runner`] | Processor invocation with timeouts |
//! | [`analyzer`] | Per-artifact chunk statistics |
//! | [`scorer`] | Weighted quality score and tiers |
//! | [`report`] | Aggregation, rendering, persistence |
//! | [`harness`] | Live and offline orchestration |
//! | [`progress`] | Batch progress on stderr |

pub mod analyzer;
pub mod artifact;
pub mod config;
pub mod discovery;
pub mod error;
pub mod harness;
pub mod progress;
pub mod report;
pub mod runner;
pub mod scorer;
pub mod stats;
