//! Processor output schema.
//!
//! An [`Artifact`] is the JSON document the external chunking processor
//! writes for one input file. The harness never produces or mutates
//! artifacts; it only loads them, once, through [`Artifact::load`] or
//! [`Artifact::from_json`], where serde validates the required keys.
//! Everything downstream works with typed, optional-aware fields instead of
//! probing raw JSON.
//!
//! Optional keys the processor may emit (`filepath`, `processor`,
//! `processed_at`, …) are accepted but never required. Unknown keys are
//! ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Failure to turn a file into an [`Artifact`].
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The processor's output for one input file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub document_metadata: DocumentMetadata,
    pub processing_info: ProcessingInfo,
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub filename: String,
    /// Free-form type tag as emitted by the processor (`"PDF"`, `"TXT"`, …).
    pub document_type: String,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingInfo {
    /// Chunk count as reported by the processor. Not trusted for analysis;
    /// see [`crate::analyzer::ChunkCountAnomaly`].
    pub total_chunks: u64,
    pub processing_time_ms: f64,
    pub total_content_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

/// One unit of extracted content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub size: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Format-dependent extras. JSON `null` and an absent key both land here
    /// as `None`.
    #[serde(default)]
    pub format_specific: Option<Value>,
}

impl ChunkMetadata {
    /// `format_specific.word_count`, when the processor supplied one.
    pub fn word_count(&self) -> Option<u64> {
        self.format_specific
            .as_ref()
            .and_then(|fs| fs.get("word_count"))
            .and_then(Value::as_u64)
    }
}

impl Artifact {
    /// Read and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Whitespace-delimited token count across every chunk's content.
    pub fn total_words(&self) -> u64 {
        self.chunks
            .iter()
            .map(|c| c.content.split_whitespace().count() as u64)
            .sum()
    }
}
