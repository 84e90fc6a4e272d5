/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Syu AUR error types to provide consistent
    diagnostics and exit semantics, including aggregate errors
    for fail-soft batch operations.

  Security / Safety Notes:
    Error contexts redact potentially sensitive data such as
    credentials or tokens; only high-level paths are exposed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2024-11-04 COD  Established shared error definitions.
    2026-10-16 COD  Added parse, inventory and batch domains.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::fmt;
use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Syn-Syu AUR operations.
pub type Result<T> = std::result::Result<T, SynsyuError>;

/// Enumerates high-level error domains surfaced by Syn-Syu AUR.
#[derive(Debug, Error)]
pub enum SynsyuError {
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error("Parse error on line {line}: {reason}: `{text}`")]
    Parse {
        line: usize,
        text: String,
        reason: String,
    },
    #[error("Invalid version `{input}`: {reason}")]
    Format { input: String, reason: String },
    #[error("Missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Inventory: {0}")]
    Inventory(String),
    #[error(transparent)]
    Batch(#[from] MultiError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SynsyuError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SynsyuError::CommandMissing { .. } => ExitCode::from(10),
            SynsyuError::CommandFailure { .. } => ExitCode::from(11),
            SynsyuError::Config(_) => ExitCode::from(20),
            SynsyuError::Network(_) => ExitCode::from(30),
            SynsyuError::Serialization(_) => ExitCode::from(31),
            SynsyuError::Filesystem(_) => ExitCode::from(40),
            SynsyuError::Io(_) => ExitCode::from(41),
            SynsyuError::Runtime(_) => ExitCode::from(50),
            SynsyuError::Parse { .. }
            | SynsyuError::Format { .. }
            | SynsyuError::MissingField(_) => ExitCode::from(60),
            SynsyuError::Inventory(_) => ExitCode::from(61),
            SynsyuError::Batch(_) => ExitCode::from(70),
        }
    }

    pub(crate) fn format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        SynsyuError::Format {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Aggregate of independent per-item failures from a fail-soft batch.
///
/// Each entry carries the item (package name or batch label) it belongs to.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<(String, SynsyuError)>,
}

impl MultiError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Into<String>, error: SynsyuError) {
        self.errors.push((item.into(), error));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SynsyuError)> {
        self.errors.iter().map(|(item, err)| (item.as_str(), err))
    }

    /// Names of the items that failed, in recorded order.
    pub fn items(&self) -> Vec<&str> {
        self.errors.iter().map(|(item, _)| item.as_str()).collect()
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate as an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SynsyuError::Batch(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} operation(s) failed", self.errors.len())?;
        for (item, err) in &self.errors {
            write!(f, "\n  {item}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
