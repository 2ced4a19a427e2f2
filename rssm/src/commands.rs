//! `exec` and `copy` subcommand handlers.
//!
//! Progress blocks go to stdout in text mode; JSON mode prints only the
//! final report. Failures are returned with step context for the caller
//! to classify.

use anyhow::{Context as _, Result};
use rssm_common::{
    AwsCliClient, DispatchError, Dispatcher, Payload, RUN_SHELL_SCRIPT_DOCUMENT, Report, Settings,
    SsmApi, Target, render_info,
};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Wording for the steps of one operation.
struct Steps {
    submit_failed: &'static str,
    poll_failed: &'static str,
    waiting: &'static str,
}

const EXEC_STEPS: Steps = Steps {
    submit_failed: "Error executing SSM command",
    poll_failed: "Error fetching command status",
    waiting: "Waiting for the result of the command execution...",
};

const COPY_STEPS: Steps = Steps {
    submit_failed: "Error transferring file via SSM",
    poll_failed: "Error fetching file transfer status",
    waiting: "Waiting for file transfer to complete...",
};

/// Per-run state shared by the subcommands.
pub struct RunContext<C> {
    pub dispatcher: Dispatcher<C>,
    pub region: String,
    pub json: bool,
}

impl RunContext<AwsCliClient> {
    pub fn from_settings(settings: &Settings, json: bool) -> Self {
        let client = AwsCliClient::new(settings.region.value.clone())
            .with_program(settings.aws_bin.value.clone())
            .with_profile(settings.profile.value.clone());
        Self {
            dispatcher: Dispatcher::new(client),
            region: settings.region.value.clone(),
            json,
        }
    }
}

impl<C: SsmApi> RunContext<C> {
    fn info<W: Write>(&self, out: &mut W, title: &str, pairs: &[(&str, String)]) -> Result<()> {
        if !self.json {
            render_info(out, title, pairs)?;
        }
        Ok(())
    }

    fn note<W: Write>(&self, out: &mut W, lines: &[&str]) -> Result<()> {
        if !self.json {
            for line in lines {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }

    async fn dispatch<W: Write>(
        &self,
        out: &mut W,
        target: &Target,
        payload: &Payload,
        wait: bool,
        steps: &Steps,
    ) -> Result<Report> {
        let invocation = self
            .dispatcher
            .submit(target, payload)
            .await
            .map_err(|err| with_step(err, steps))?;

        let mut sent = vec![
            ("Command ID", invocation.command_id.clone()),
            ("Document Name", RUN_SHELL_SCRIPT_DOCUMENT.to_string()),
            ("Target Instance", target.to_string()),
        ];
        let title = match payload {
            Payload::Command { .. } => "COMMAND SENT SUCCESSFULLY",
            Payload::Transfer { info, .. } => {
                sent.push(("Transfer Type", "Base64 encoded file transfer".to_string()));
                sent.push(("Source File", info.source.display().to_string()));
                sent.push(("Destination Path", info.destination.clone()));
                "FILE TRANSFER COMMAND SENT SUCCESSFULLY"
            }
        };
        self.info(out, title, &sent)?;

        if wait {
            self.note(
                out,
                &[
                    steps.waiting,
                    "The system is polling AWS SSM service for command completion...\n",
                ],
            )?;
            out.flush()?;
        }

        self.dispatcher
            .run(invocation, wait)
            .await
            .map_err(|err| with_step(err, steps))
    }

    /// Run a shell command on `target`.
    pub async fn exec<W: Write>(
        &self,
        out: &mut W,
        target: &Target,
        command: &str,
        sudo: bool,
        wait: bool,
    ) -> Result<Report> {
        let payload = Payload::command(command, sudo).context("Invalid command")?;

        if let Payload::Command { text, sudo } = &payload {
            self.info(
                out,
                "SENDING COMMAND",
                &[
                    ("Target Instance", target.to_string()),
                    ("Region", self.region.clone()),
                    ("Command", text.clone()),
                    ("Using Sudo", sudo.to_string()),
                ],
            )?;
        }

        self.dispatch(out, target, &payload, wait, &EXEC_STEPS).await
    }

    /// Recreate `local` at `remote` on `target`.
    pub async fn copy<W: Write>(
        &self,
        out: &mut W,
        target: &Target,
        local: &Path,
        remote: &str,
        sudo: bool,
        wait: bool,
    ) -> Result<Report> {
        let payload = Payload::transfer(local, remote, sudo)
            .context("Failed to prepare file transfer")?;

        if let Payload::Transfer { info, script, .. } = &payload {
            debug!(script_bytes = script.len(), "Transfer script generated");
            let using_sudo = if sudo {
                "Yes (for directory creation and file writing)"
            } else {
                "No"
            };
            self.info(
                out,
                "FILE TRANSFER INITIATED",
                &[
                    ("Source File", info.source.display().to_string()),
                    ("Destination", info.destination.clone()),
                    ("File Size", info.size_label()),
                    ("File Name", info.file_name.clone()),
                    ("Using Sudo", using_sudo.to_string()),
                    ("Target Instance", target.to_string()),
                    ("Region", self.region.clone()),
                ],
            )?;
        }

        self.dispatch(out, target, &payload, wait, &COPY_STEPS).await
    }
}

fn with_step(err: DispatchError, steps: &Steps) -> anyhow::Error {
    let step = match err {
        DispatchError::Submission { .. } => steps.submit_failed,
        DispatchError::MissingInvocationId { .. } => "Failed to get Command ID from response",
        DispatchError::Poll { .. } => steps.poll_failed,
    };
    anyhow::Error::new(err).context(step)
}
