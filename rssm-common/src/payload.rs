//! Payload preparation.
//!
//! Turns operator input into the text that is executed on the instance:
//! either the command itself (optionally `sudo`-prefixed) or a generated
//! shell script that recreates a local file at a remote path.

use crate::types::{OperationKind, format_file_size};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SUDO_PREFIX: &str = "sudo ";

/// Errors raised while building a payload. All of them happen before any
/// remote call is made.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Failed to read local file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid remote path '{path}': {reason}")]
    InvalidRemotePath { path: String, reason: &'static str },

    #[error("Command is empty")]
    EmptyCommand,
}

/// Where the `sudo` in a direct command came from. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SudoStatus {
    InCommandAndFlag,
    InCommand,
    ViaFlag,
    No,
}

impl SudoStatus {
    pub const fn from_flags(already_has_sudo: bool, flag: bool) -> Self {
        match (already_has_sudo, flag) {
            (true, true) => Self::InCommandAndFlag,
            (true, false) => Self::InCommand,
            (false, true) => Self::ViaFlag,
            (false, false) => Self::No,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::InCommandAndFlag => "Yes (in command and via flag)",
            Self::InCommand => "Yes (in command)",
            Self::ViaFlag => "Yes (via flag)",
            Self::No => "No",
        }
    }
}

impl std::fmt::Display for SudoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Display metadata for a file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferInfo {
    pub source: PathBuf,
    pub destination: String,
    pub file_name: String,
    pub size_bytes: u64,
}

impl TransferInfo {
    pub fn size_label(&self) -> String {
        format_file_size(self.size_bytes)
    }
}

/// Executable text for one invocation plus what the operator should see about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Command { text: String, sudo: SudoStatus },
    Transfer { script: String, info: TransferInfo, sudo: bool },
}

impl Payload {
    /// Build a direct-command payload.
    pub fn command(raw: &str, sudo: bool) -> Result<Self, PrepareError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PrepareError::EmptyCommand);
        }

        let already_has_sudo = trimmed.starts_with(SUDO_PREFIX);
        let text = if sudo && !already_has_sudo {
            format!("{SUDO_PREFIX}{trimmed}")
        } else {
            trimmed.to_string()
        };

        Ok(Self::Command {
            text,
            sudo: SudoStatus::from_flags(already_has_sudo, sudo),
        })
    }

    /// Build a file-transfer payload from a local file.
    pub fn transfer(local: &Path, remote: &str, sudo: bool) -> Result<Self, PrepareError> {
        let dest_dir = remote_parent(remote)?;
        let bytes = std::fs::read(local).map_err(|source| PrepareError::Io {
            path: local.to_path_buf(),
            source,
        })?;

        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| local.display().to_string());

        let script = transfer_script(&STANDARD.encode(&bytes), remote, dest_dir, sudo);

        Ok(Self::Transfer {
            script,
            info: TransferInfo {
                source: local.to_path_buf(),
                destination: remote.to_string(),
                file_name,
                size_bytes: bytes.len() as u64,
            },
            sudo,
        })
    }

    /// The text sent to the instance.
    pub fn text(&self) -> &str {
        match self {
            Self::Command { text, .. } => text,
            Self::Transfer { script, .. } => script,
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            Self::Command { .. } => OperationKind::CommandExecution,
            Self::Transfer { info, .. } => OperationKind::FileTransfer {
                source: info.source.clone(),
                destination: info.destination.clone(),
                size_bytes: info.size_bytes,
            },
        }
    }
}

/// Directory that must exist before the remote file can be written.
fn remote_parent(remote: &str) -> Result<&str, PrepareError> {
    let invalid = |reason| PrepareError::InvalidRemotePath {
        path: remote.to_string(),
        reason,
    };

    if remote.is_empty() {
        return Err(invalid("path is empty"));
    }
    if remote.ends_with('/') {
        return Err(invalid("path names a directory, not a file"));
    }
    if remote
        .chars()
        .any(|c| matches!(c, '"' | '\\' | '$' | '`' | '\n' | '\r'))
    {
        return Err(invalid("path contains shell metacharacters"));
    }

    Ok(match remote.rfind('/') {
        Some(0) => "/",
        Some(idx) => &remote[..idx],
        None => ".",
    })
}

// The encoded blob only ever appears inside the single-quoted echo; the
// alphabet has no quote characters.
fn transfer_script(encoded: &str, remote: &str, dest_dir: &str, sudo: bool) -> String {
    let sudo = if sudo { SUDO_PREFIX } else { "" };
    format!(
        r#"
# Ensure destination directory exists
if [ ! -d "{dest_dir}" ]; then
  {sudo}mkdir -p "{dest_dir}"
  if [ $? -ne 0 ]; then
    echo "Failed to create directory: {dest_dir}"
    exit 1
  fi
fi

# Transfer the file
{sudo}bash -c "echo '{encoded}' | base64 --decode > \"{remote}\""
if [ $? -eq 0 ]; then
  echo "File successfully transferred to {remote}"
  ls -la "{remote}"
else
  echo "Failed to write file to {remote}"
  exit 1
fi
"#
    )
}
