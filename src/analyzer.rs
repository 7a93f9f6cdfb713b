//! Statistical analysis of a single artifact.
//!
//! [`analyze`] is a pure function of the artifact: no I/O, no hidden state,
//! so analysing the same artifact twice yields identical output. The
//! resulting [`Analysis`] feeds the scorer and the reports.
//!
//! # Metrics
//!
//! - **Size statistics** over `chunk.metadata.size`, in artifact order.
//! - **Average word count** over chunks that carry
//!   `format_specific.word_count`; chunks without it are left out rather
//!   than counted as zero.
//! - **Throughput** in characters and chunks per millisecond of processor
//!   time; 0 when the processor reports 0 ms.
//! - **Vector-store ratios**, each in `[0, 1]`:
//!   - optimal size: share of chunks sized within [`OPTIMAL_SIZE_MIN`] ..=
//!     [`OPTIMAL_SIZE_MAX`] characters;
//!   - content variety: distinct [`PREFIX_CHARS`]-character content prefixes
//!     divided by the chunk count;
//!   - metadata richness: present, non-null `(chunk, field)` pairs over
//!     [`METADATA_FIELDS`].
//!
//! The actual chunk list is the source of truth for counts. A processor
//! reporting a different `total_chunks` is flagged in
//! [`Analysis::chunk_count_anomaly`].

use serde::Serialize;
use std::collections::HashSet;

use crate::artifact::{Artifact, Chunk};
use crate::stats::{self, Summary};

pub const OPTIMAL_SIZE_MIN: u64 = 500;
pub const OPTIMAL_SIZE_MAX: u64 = 1500;

/// Prefix length used to approximate duplicate detection.
pub const PREFIX_CHARS: usize = 100;

pub const METADATA_FIELDS: &[&str] = &["size", "language", "confidence", "format_specific"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub filename: String,
    pub document_type: String,
    pub file_size: u64,
    pub processing_time_ms: f64,
    pub total_content_size: u64,
    pub chunks: ChunkStats,
    pub performance: Throughput,
    pub vector_store_quality: VectorStoreQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count_anomaly: Option<ChunkCountAnomaly>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChunkStats {
    pub count: usize,
    pub size: Summary,
    pub avg_word_count: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Throughput {
    pub chars_per_ms: f64,
    pub chunks_per_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VectorStoreQuality {
    pub optimal_size_ratio: f64,
    pub content_variety: f64,
    pub metadata_richness: f64,
}

/// The processor's reported chunk count disagrees with the chunk list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkCountAnomaly {
    pub reported: u64,
    pub actual: usize,
}

pub fn analyze(artifact: &Artifact) -> Analysis {
    let chunks = &artifact.chunks;
    let info = &artifact.processing_info;

    let sizes: Vec<f64> = chunks.iter().map(|c| c.metadata.size as f64).collect();
    let word_counts: Vec<f64> = chunks
        .iter()
        .filter_map(|c| c.metadata.word_count())
        .map(|w| w as f64)
        .collect();

    let chunk_count_anomaly = if info.total_chunks != chunks.len() as u64 {
        Some(ChunkCountAnomaly {
            reported: info.total_chunks,
            actual: chunks.len(),
        })
    } else {
        None
    };

    Analysis {
        filename: artifact.document_metadata.filename.clone(),
        document_type: artifact.document_metadata.document_type.clone(),
        file_size: artifact.document_metadata.file_size,
        processing_time_ms: info.processing_time_ms,
        total_content_size: info.total_content_size,
        chunks: ChunkStats {
            count: chunks.len(),
            size: Summary::of(&sizes),
            avg_word_count: stats::mean(&word_counts),
        },
        performance: Throughput {
            chars_per_ms: stats::ratio(info.total_content_size as f64, info.processing_time_ms),
            chunks_per_ms: stats::ratio(chunks.len() as f64, info.processing_time_ms),
        },
        vector_store_quality: VectorStoreQuality {
            optimal_size_ratio: optimal_size_ratio(chunks),
            content_variety: content_variety(chunks),
            metadata_richness: metadata_richness(chunks),
        },
        chunk_count_anomaly,
    }
}

fn optimal_size_ratio(chunks: &[Chunk]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    let optimal = chunks
        .iter()
        .filter(|c| (OPTIMAL_SIZE_MIN..=OPTIMAL_SIZE_MAX).contains(&c.metadata.size))
        .count();
    optimal as f64 / chunks.len() as f64
}

fn content_variety(chunks: &[Chunk]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    let prefixes: HashSet<&str> = chunks.iter().map(|c| prefix(&c.content)).collect();
    prefixes.len() as f64 / chunks.len() as f64
}

/// First [`PREFIX_CHARS`] characters of `s`, on a char boundary.
fn prefix(s: &str) -> &str {
    match s.char_indices().nth(PREFIX_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn metadata_richness(chunks: &[Chunk]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    let filled: usize = chunks
        .iter()
        .map(|c| {
            let m = &c.metadata;
            // `size` is required by the schema, so it is always present.
            1 + usize::from(m.language.is_some())
                + usize::from(m.confidence.is_some())
                + usize::from(m.format_specific.is_some())
        })
        .sum();
    filled as f64 / (chunks.len() * METADATA_FIELDS.len()) as f64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::artifact::{ChunkMetadata, DocumentMetadata, ProcessingInfo};
    use serde_json::json;

    pub(crate) fn full_chunk(content: &str, size: u64) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                size,
                language: Some("en".to_string()),
                confidence: Some(0.95),
                format_specific: Some(json!({ "word_count": 150 })),
            },
        }
    }

    pub(crate) fn bare_chunk(content: &str, size: u64) -> Chunk {
        Chunk {
            content: content.to_string(),
            metadata: ChunkMetadata {
                size,
                language: None,
                confidence: None,
                format_specific: None,
            },
        }
    }

    pub(crate) fn artifact(chunks: Vec<Chunk>, time_ms: f64, content_size: u64) -> Artifact {
        Artifact {
            document_metadata: DocumentMetadata {
                filename: "sample.txt".to_string(),
                document_type: "TXT".to_string(),
                file_size: content_size,
                filepath: None,
                title: None,
                author: None,
            },
            processing_info: ProcessingInfo {
                total_chunks: chunks.len() as u64,
                processing_time_ms: time_ms,
                total_content_size: content_size,
                processor: None,
                processor_version: None,
                processed_at: None,
            },
            chunks,
        }
    }

    /// Four full-metadata 1000-char chunks with distinct prefixes, 2 ms.
    pub(crate) fn scenario_a() -> Artifact {
        let chunks = (0..4)
            .map(|i| full_chunk(&format!("chunk {} {}", i, "x".repeat(990)), 1000))
            .collect();
        artifact(chunks, 2.0, 4000)
    }

    /// Three tiny chunks without optional metadata, 1000 ms for 60 chars.
    pub(crate) fn scenario_b() -> Artifact {
        let chunks = vec![
            bare_chunk("alpha", 10),
            bare_chunk("beta", 20),
            bare_chunk("gamma", 30),
        ];
        artifact(chunks, 1000.0, 60)
    }

    #[test]
    fn test_scenario_a_is_ideal() {
        let a = analyze(&scenario_a());
        assert_eq!(a.vector_store_quality.optimal_size_ratio, 1.0);
        assert_eq!(a.vector_store_quality.content_variety, 1.0);
        assert_eq!(a.vector_store_quality.metadata_richness, 1.0);
        assert_eq!(a.performance.chars_per_ms, 2000.0);
        assert_eq!(a.performance.chunks_per_ms, 2.0);
        assert_eq!(a.chunks.size.std_dev, 0.0);
        assert_eq!(a.chunks.size.mean, 1000.0);
        assert_eq!(a.chunks.avg_word_count, 150.0);
        assert!(a.chunk_count_anomaly.is_none());
    }

    #[test]
    fn test_scenario_b_ratios() {
        let a = analyze(&scenario_b());
        assert_eq!(a.vector_store_quality.optimal_size_ratio, 0.0);
        assert_eq!(a.vector_store_quality.content_variety, 1.0);
        assert_eq!(a.vector_store_quality.metadata_richness, 0.25);
        assert!((a.performance.chars_per_ms - 0.06).abs() < 1e-12);
        assert!((a.chunks.size.std_dev - 10.0).abs() < 1e-12);
        assert_eq!(a.chunks.avg_word_count, 0.0);
    }

    #[test]
    fn test_zero_chunks_is_all_zero() {
        let a = analyze(&artifact(Vec::new(), 0.0, 0));
        assert_eq!(a.chunks.count, 0);
        assert_eq!(a.chunks.size, Summary::default());
        assert_eq!(a.chunks.avg_word_count, 0.0);
        assert_eq!(a.performance.chars_per_ms, 0.0);
        assert_eq!(a.performance.chunks_per_ms, 0.0);
        assert_eq!(a.vector_store_quality.optimal_size_ratio, 0.0);
        assert_eq!(a.vector_store_quality.content_variety, 0.0);
        assert_eq!(a.vector_store_quality.metadata_richness, 0.0);
    }

    #[test]
    fn test_zero_time_throughput_is_zero() {
        let a = analyze(&artifact(vec![full_chunk("abc", 700)], 0.0, 700));
        assert_eq!(a.performance.chars_per_ms, 0.0);
        assert_eq!(a.performance.chunks_per_ms, 0.0);
    }

    #[test]
    fn test_optimal_window_is_inclusive() {
        let chunks = vec![
            full_chunk("a", 499),
            full_chunk("b", 500),
            full_chunk("c", 1500),
            full_chunk("d", 1501),
        ];
        let a = analyze(&artifact(chunks, 1.0, 4000));
        assert_eq!(a.vector_store_quality.optimal_size_ratio, 0.5);
    }

    #[test]
    fn test_variety_uses_hundred_char_prefix() {
        let shared = "s".repeat(PREFIX_CHARS);
        let chunks = vec![
            full_chunk(&format!("{}tail one", shared), 800),
            full_chunk(&format!("{}tail two", shared), 800),
            full_chunk("something else", 800),
            full_chunk("yet another", 800),
        ];
        let a = analyze(&artifact(chunks, 1.0, 3200));
        assert_eq!(a.vector_store_quality.content_variety, 0.75);
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        let s = "é".repeat(150);
        assert_eq!(prefix(&s).chars().count(), PREFIX_CHARS);
        assert_eq!(prefix("short"), "short");
    }

    #[test]
    fn test_missing_language_costs_one_field() {
        let mut chunk = full_chunk("content", 800);
        chunk.metadata.language = None;
        let a = analyze(&artifact(vec![chunk], 1.0, 800));
        assert_eq!(a.vector_store_quality.metadata_richness, 0.75);
    }

    #[test]
    fn test_word_count_mean_skips_chunks_without_it() {
        let mut with_count = full_chunk("a", 800);
        with_count.metadata.format_specific = Some(json!({ "word_count": 90 }));
        let mut other_keys = full_chunk("b", 800);
        other_keys.metadata.format_specific = Some(json!({ "line_count": 3 }));
        let a = analyze(&artifact(vec![with_count, other_keys, bare_chunk("c", 800)], 1.0, 2400));
        assert_eq!(a.chunks.avg_word_count, 90.0);
    }

    #[test]
    fn test_chunk_count_mismatch_is_flagged() {
        let mut art = scenario_a();
        art.processing_info.total_chunks = 9;
        let a = analyze(&art);
        assert_eq!(
            a.chunk_count_anomaly,
            Some(ChunkCountAnomaly {
                reported: 9,
                actual: 4
            })
        );
        // Counts and rates still come from the chunk list.
        assert_eq!(a.chunks.count, 4);
        assert_eq!(a.performance.chunks_per_ms, 2.0);
    }

    #[test]
    fn test_ratios_stay_in_unit_interval() {
        for art in [scenario_a(), scenario_b(), artifact(Vec::new(), 3.0, 10)] {
            let q = analyze(&art).vector_store_quality;
            for r in [q.optimal_size_ratio, q.content_variety, q.metadata_richness] {
                assert!((0.0..=1.0).contains(&r), "ratio out of range: {}", r);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let art = scenario_b();
        assert_eq!(analyze(&art), analyze(&art));
    }
}
