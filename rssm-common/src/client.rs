//! Remote execution client facade.
//!
//! The dispatch engine only needs two calls from the command-execution
//! service: submit a payload and fetch the status of an invocation. Both are
//! expressed by [`SsmApi`] so the engine can run against the real service
//! ([`crate::aws_cli::AwsCliClient`]) or a scripted one ([`crate::mock::MockSsm`]).

use crate::types::Target;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Document that runs the payload as a shell script on the instance.
pub const RUN_SHELL_SCRIPT_DOCUMENT: &str = "AWS-RunShellScript";

/// Network failure codes the classifier treats as connectivity problems.
pub const NETWORK_CODES: &[&str] = &["ENOTFOUND", "ECONNREFUSED", "ETIMEDOUT", "ECONNRESET"];

/// Result of a submit call. A missing id is a service anomaly the caller must handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub command_id: Option<String>,
}

/// One status-RPC response. Every field is optional; empty strings are
/// normalised to `None` by [`InvocationSnapshot::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSnapshot {
    pub status: Option<String>,
    pub status_details: Option<String>,
    pub execution_start: Option<String>,
    pub execution_end: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub response_code: Option<i64>,
}

impl InvocationSnapshot {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }

    pub fn window(mut self, start: impl Into<String>, end: Option<&str>) -> Self {
        self.execution_start = Some(start.into());
        self.execution_end = end.map(String::from);
        self
    }

    /// Drop empty strings so "present" always means "has content".
    pub fn normalized(self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }
        Self {
            status: non_empty(self.status),
            status_details: non_empty(self.status_details),
            execution_start: non_empty(self.execution_start),
            execution_end: non_empty(self.execution_end),
            stdout: non_empty(self.stdout),
            stderr: non_empty(self.stderr),
            response_code: self.response_code,
        }
    }
}

/// Failures reported by a remote execution client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service rejected the request.
    #[error("{name} ({status}): {message}")]
    Service {
        name: String,
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// The service endpoint could not be reached.
    #[error("network error {code}: {message}")]
    Network { code: String, message: String },

    /// The client tool itself could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The service answered with something we could not decode.
    #[error("unexpected response from service: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{message}")]
    Other { message: String },
}

impl ClientError {
    pub fn service(name: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            name: name.into(),
            status,
            message: message.into(),
            request_id: None,
        }
    }

    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// The two RPCs the dispatch engine issues against the command-execution service.
pub trait SsmApi {
    /// Submit `payload` for execution on `target` using `document`.
    fn send_command(
        &self,
        target: &Target,
        document: &str,
        payload: &str,
    ) -> impl Future<Output = Result<SubmitResponse, ClientError>> + Send;

    /// Fetch the current state of an invocation.
    fn get_invocation(
        &self,
        command_id: &str,
        target: &Target,
    ) -> impl Future<Output = Result<InvocationSnapshot, ClientError>> + Send;
}
