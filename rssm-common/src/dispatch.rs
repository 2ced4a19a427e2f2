//! Dispatch and completion polling.
//!
//! One invocation per run: submit the payload, then (optionally) poll the
//! status RPC at a fixed interval until the service reports a terminal
//! status. There is no backoff, no retry budget and no overall deadline; a
//! failed poll call ends the run.
//!
//! ```text
//! Created -> Submitted -> {Pending <-> InProgress} -> {Success | Failed | Cancelled | TimedOut | Unknown}
//! ```

use crate::client::{ClientError, InvocationSnapshot, RUN_SHELL_SCRIPT_DOCUMENT, SsmApi};
use crate::payload::Payload;
use crate::report::Report;
use crate::types::{ExecutionWindow, InvocationStatus, OperationKind, Target};
use crate::util::{LOG_EXCERPT_CHARS, excerpt, mask_sensitive_command};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Delay between status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Section marker placed between standard output and standard error.
pub const STDERR_MARKER: &str = "--- Standard Error ---";

/// Failures that end a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to submit command to {target}")]
    Submission {
        target: Target,
        #[source]
        source: ClientError,
    },

    #[error("Service accepted the command for {target} but returned no command ID")]
    MissingInvocationId { target: Target },

    #[error("Failed to fetch status of command {command_id} on {target}")]
    Poll {
        command_id: String,
        target: Target,
        #[source]
        source: ClientError,
    },
}

/// Raised by callers when a run reached a terminal status other than `Success`.
#[derive(Debug, Error)]
#[error("{operation} completed with non-success status: {status}")]
pub struct InvocationFailed {
    pub command_id: String,
    pub operation: &'static str,
    pub status: InvocationStatus,
}

impl InvocationFailed {
    /// `Some` when the report describes a waited-for run that did not succeed.
    pub fn from_report(report: &Report) -> Option<Self> {
        if report.is_success() {
            return None;
        }
        Some(Self {
            command_id: report.command_id.clone(),
            operation: report.operation.label(),
            status: report.status,
        })
    }
}

/// A submitted unit of work.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command_id: String,
    pub target: Target,
    pub operation: OperationKind,
    /// Taken just before the submit call; duration is measured from here.
    pub submitted_at: Instant,
    pub submitted_wall: DateTime<Utc>,
}

/// Latest-wins holder of the fields refreshed by each poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputAccumulator {
    stdout: Option<String>,
    stderr: Option<String>,
    window: ExecutionWindow,
}

impl OutputAccumulator {
    /// Fold one status response in. Present fields overwrite; absent ones keep
    /// the previous value, except stderr which always mirrors the latest poll.
    pub fn absorb(&mut self, snapshot: &InvocationSnapshot) {
        if let Some(ref start) = snapshot.execution_start {
            self.window.start = Some(start.clone());
        }
        if let Some(ref end) = snapshot.execution_end {
            self.window.end = Some(end.clone());
        }
        if let Some(ref stdout) = snapshot.stdout {
            self.stdout = Some(stdout.clone());
        }
        self.stderr = snapshot.stderr.clone();
    }

    /// Standard output followed by the standard error section, if any.
    pub fn output(&self) -> String {
        let mut out = self.stdout.clone().unwrap_or_default();
        if let Some(ref stderr) = self.stderr {
            out.push_str("\n\n");
            out.push_str(STDERR_MARKER);
            out.push('\n');
            out.push_str(stderr);
        }
        out
    }

    pub fn window(&self) -> &ExecutionWindow {
        &self.window
    }
}

/// Drives one invocation against an [`SsmApi`] client.
pub struct Dispatcher<C> {
    client: C,
    poll_interval: Duration,
}

impl<C: SsmApi> Dispatcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Submit `payload` to `target`. The service must hand back a command id.
    pub async fn submit(&self, target: &Target, payload: &Payload) -> Result<Invocation, DispatchError> {
        let submitted_at = Instant::now();
        let submitted_wall = Utc::now();

        info!(
            instance = %target,
            operation = payload.operation().label(),
            "Submitting command"
        );
        if let Payload::Command { text, .. } = payload {
            debug!(
                command = %excerpt(&mask_sensitive_command(text), LOG_EXCERPT_CHARS),
                "Command payload"
            );
        }

        let response = self
            .client
            .send_command(target, RUN_SHELL_SCRIPT_DOCUMENT, payload.text())
            .await
            .map_err(|source| DispatchError::Submission {
                target: target.clone(),
                source,
            })?;

        let Some(command_id) = response.command_id else {
            warn!(instance = %target, "Submit response carried no command ID");
            return Err(DispatchError::MissingInvocationId {
                target: target.clone(),
            });
        };

        info!(instance = %target, command_id = %command_id, "Command submitted");

        Ok(Invocation {
            command_id,
            target: target.clone(),
            operation: payload.operation(),
            submitted_at,
            submitted_wall,
        })
    }

    /// Follow an invocation to a terminal status, or return at once when not waiting.
    pub async fn run(&self, invocation: Invocation, wait: bool) -> Result<Report, DispatchError> {
        if !wait {
            debug!(command_id = %invocation.command_id, "Not waiting for completion");
            return Ok(Report::from_invocation(
                invocation,
                InvocationStatus::Pending,
                OutputAccumulator::default(),
                false,
            ));
        }

        let mut acc = OutputAccumulator::default();
        let mut polls: u32 = 0;
        let status = loop {
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;

            let snapshot = self
                .client
                .get_invocation(&invocation.command_id, &invocation.target)
                .await
                .map_err(|source| DispatchError::Poll {
                    command_id: invocation.command_id.clone(),
                    target: invocation.target.clone(),
                    source,
                })?;

            let status = InvocationStatus::from_service(snapshot.status.as_deref());
            acc.absorb(&snapshot);
            debug!(
                command_id = %invocation.command_id,
                poll = polls,
                status = %status,
                "Polled invocation status"
            );

            if status.is_terminal() {
                break status;
            }
        };

        info!(
            command_id = %invocation.command_id,
            status = %status,
            polls,
            elapsed_ms = invocation.submitted_at.elapsed().as_millis() as u64,
            "Invocation finished"
        );

        Ok(Report::from_invocation(invocation, status, acc, true))
    }

    /// Submit and run in one step.
    pub async fn dispatch(
        &self,
        target: &Target,
        payload: &Payload,
        wait: bool,
    ) -> Result<Report, DispatchError> {
        let invocation = self.submit(target, payload).await?;
        self.run(invocation, wait).await
    }
}
