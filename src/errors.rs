//! Error and diagnostic types.
//!
//! Two families live here:
//! - Setup errors (`ConfigError`, `SchemaError`) which abort an operation
//!   before any document is processed.
//! - Per-document diagnostics (`ErrorWithLocation`) which are accumulated and
//!   returned as data so one broken literal never stops the batch.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity levels for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Location of a diagnostic in the original host source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file_name: String,
    /// Full text of the host source file.
    pub content: Arc<str>,
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl ErrorLocation {
    /// 1-based line and column of `start`.
    pub fn line_column(&self) -> (usize, usize) {
        crate::host::LineIndex::new(&self.content).line_column(self.start)
    }

    /// 1-based line and column of `end`.
    pub fn end_line_column(&self) -> (usize, usize) {
        crate::host::LineIndex::new(&self.content).line_column(self.end)
    }
}

/// A diagnostic, optionally pointing at a span of host source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorWithLocation {
    pub message: String,
    pub severity: Severity,
    pub location: Option<ErrorLocation>,
}

impl ErrorWithLocation {
    pub fn new(message: impl Into<String>, location: ErrorLocation) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            location: Some(location),
        }
    }

    /// A diagnostic that cannot be attributed to a source span.
    pub fn unlocated(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            location: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ErrorWithLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => {
                let (line, col) = loc.line_column();
                write!(f, "{}:{}:{} - {}", loc.file_name, line, col, self.message)
            }
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ErrorWithLocation {}

/// Errors raised while loading or checking the project configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("project path does not exist: {0}")]
    ProjectNotFound(PathBuf),
    #[error("no configuration file found in {dir} (looked for {candidates})")]
    ConfigNotFound { dir: PathBuf, candidates: String },
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("configuration has no \"schema\" field")]
    MissingSchema,
    #[error("unknown typegen addon \"{0}\"")]
    UnknownAddon(String),
}

/// Errors raised while acquiring the schema.
#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid schema {path}: {message}")]
    Invalid { path: String, message: String },
    #[error("invalid local schema extension {path}: {message}")]
    InvalidExtension { path: String, message: String },
}
