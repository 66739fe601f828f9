//! Job output sink.
//!
//! CI runners collect step outputs from a file named by `GITHUB_OUTPUT`, one
//! `key=value` line per output.

use crate::{Error, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Output key holding the selected branches.
pub const DELETED_BRANCHES_KEY: &str = "deleted_branches";

/// Appends `key=value` lines to the job output file.
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    path: Option<PathBuf>,
}

impl JobOutput {
    /// Environment variable naming the output file.
    pub const ENV_VAR: &'static str = "GITHUB_OUTPUT";

    /// Uses the file named by `GITHUB_OUTPUT`, if set.
    #[must_use]
    pub fn from_env() -> Self {
        let path = std::env::var_os(Self::ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self { path }
    }

    /// Uses an explicit output file.
    #[must_use]
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the output file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends one output. Returns `false` when no output file is configured.
    pub fn write(&self, key: &str, value: &str) -> Result<bool> {
        if key.is_empty() || key.contains(['=', '\n', '\r']) {
            return Err(Error::InvalidInput(format!("invalid output key '{key}'")));
        }
        if value.contains(['\n', '\r']) {
            return Err(Error::InvalidInput(format!(
                "output '{key}' must be a single line"
            )));
        }
        let Some(path) = self.path.as_deref() else {
            warn!(
                key,
                "{} is not set, skipping job output",
                Self::ENV_VAR
            );
            return Ok(false);
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::OperationFailed {
                operation: "open_job_output".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
        writeln!(file, "{key}={value}").map_err(|e| Error::OperationFailed {
            operation: "write_job_output".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        debug!(key, path = %path.display(), "Wrote job output");
        Ok(true)
    }

    /// Writes a branch list as a JSON array.
    pub fn write_branches(&self, key: &str, branches: &[String]) -> Result<bool> {
        let value = serde_json::to_string(branches).map_err(|e| Error::OperationFailed {
            operation: "serialize_job_output".to_string(),
            cause: e.to_string(),
        })?;
        self.write(key, &value)
    }
}
