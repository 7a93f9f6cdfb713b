//! Run-level faults.
//!
//! These abort a harness run before any per-file work starts. Faults scoped
//! to a single input are not errors at this level: they are recorded as
//! [`crate::runner::RunFailure`] values and the batch moves on.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("processor executable not found at {}", .0.display())]
    MissingExecutable(PathBuf),

    #[error("directory does not exist: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("processor build failed (exit code {code:?}): {stderr}")]
    BuildFailed { code: Option<i32>, stderr: String },

    #[error("processor build timed out after {0}s")]
    BuildTimeout(u64),

    #[error("failed to launch build command '{command}': {source}")]
    BuildLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
