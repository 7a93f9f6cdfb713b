//! TOML configuration for the harness.
//!
//! ```toml
//! [processor]
//! executable = "./target/release/doc_loader"
//! timeout_secs = 120
//! chunk_size = 1200
//! chunk_overlap = 120
//! detect_language = true
//! pretty = true
//! build = ["cargo", "build", "--release"]
//!
//! [paths]
//! corpus_dir = "testing/corpus"
//! results_dir = "testing/results"
//! reports_dir = "testing/reports"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessorConfig {
    pub executable: PathBuf,
    /// Arguments placed before the standard template, e.g. a script path
    /// when `executable` is an interpreter.
    #[serde(default)]
    pub leading_args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_true")]
    pub detect_language: bool,
    #[serde(default = "default_true")]
    pub pretty: bool,
    /// Optional one-off build command run before the batch, as argv.
    #[serde(default)]
    pub build: Option<Vec<String>>,
    /// Working directory for `build`; defaults to the current directory.
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./target/release/doc_loader"),
            leading_args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            detect_language: true,
            pretty: true,
            build: None,
            build_dir: None,
            build_timeout_secs: default_build_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}
fn default_chunk_size() -> usize {
    1200
}
fn default_chunk_overlap() -> usize {
    120
}
fn default_true() -> bool {
    true
}
fn default_build_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            results_dir: default_results_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("testing/corpus")
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("testing/results")
}
fn default_reports_dir() -> PathBuf {
    PathBuf::from("testing/reports")
}

impl Config {
    /// Defaults for commands that work without a config file
    /// (`evaluate`, `inspect`).
    pub fn minimal() -> Self {
        Self {
            processor: ProcessorConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let p = &config.processor;

    if p.executable.as_os_str().is_empty() {
        anyhow::bail!("processor.executable must not be empty");
    }
    if p.timeout_secs == 0 {
        anyhow::bail!("processor.timeout_secs must be > 0");
    }
    if p.chunk_size == 0 {
        anyhow::bail!("processor.chunk_size must be > 0");
    }
    if p.chunk_overlap >= p.chunk_size {
        anyhow::bail!(
            "processor.chunk_overlap ({}) must be smaller than processor.chunk_size ({})",
            p.chunk_overlap,
            p.chunk_size
        );
    }
    if let Some(build) = &p.build {
        if build.is_empty() {
            anyhow::bail!("processor.build must name a command when set");
        }
        if p.build_timeout_secs == 0 {
            anyhow::bail!("processor.build_timeout_secs must be > 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults_fill_in() {
        let config = parse("[processor]\nexecutable = \"/usr/bin/doc_loader\"\n").unwrap();
        assert_eq!(config.processor.timeout_secs, 120);
        assert_eq!(config.processor.chunk_size, 1200);
        assert_eq!(config.processor.chunk_overlap, 120);
        assert!(config.processor.detect_language);
        assert!(config.processor.pretty);
        assert!(config.processor.build.is_none());
        assert_eq!(config.paths.results_dir, PathBuf::from("testing/results"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = parse("[processor]\nexecutable = \"x\"\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        let err = parse("[processor]\nexecutable = \"x\"\nchunk_size = 100\nchunk_overlap = 100\n")
            .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_rejects_empty_build_command() {
        let err = parse("[processor]\nexecutable = \"x\"\nbuild = []\n").unwrap_err();
        assert!(err.to_string().contains("processor.build"));
    }

    #[test]
    fn test_load_config_reports_path() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn test_minimal_is_valid() {
        validate(&Config::minimal()).unwrap();
    }
}
