//! Common types used across rssm components.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier of the remote instance a command is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target(pub String);

impl Target {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an invocation as reported by the service.
///
/// `Pending` and `InProgress` are the only non-terminal states. Any status
/// string the service reports that is not recognised normalises to `Unknown`,
/// which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvocationStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
    TimedOut,
    Unknown,
}

impl InvocationStatus {
    /// Normalise a raw service status. Missing or unrecognised values map to `Unknown`.
    pub fn from_service(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("Pending") => Self::Pending,
            Some("InProgress") => Self::InProgress,
            Some("Success") => Self::Success,
            Some("Failed") => Self::Failed,
            Some("Cancelled") => Self::Cancelled,
            Some("TimedOut") => Self::TimedOut,
            _ => Self::Unknown,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::TimedOut => "TimedOut",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a payload does on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    /// A shell command run as-is.
    CommandExecution,
    /// A generated script that recreates a local file on the instance.
    FileTransfer {
        source: PathBuf,
        destination: String,
        size_bytes: u64,
    },
}

impl OperationKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CommandExecution => "Command execution",
            Self::FileTransfer { .. } => "File transfer",
        }
    }
}

/// Execution timestamps as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionWindow {
    pub start: Option<String>,
    /// Absent until the remote side finishes.
    pub end: Option<String>,
}

/// Human-readable file size as shown in transfer banners (whole kilobytes, rounded).
pub fn format_file_size(bytes: u64) -> String {
    let kb = (bytes as f64 / 1024.0).round() as u64;
    format!("{} KB", kb)
}
