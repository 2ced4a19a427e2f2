//! `SsmApi` implementation backed by the `aws` command-line tool.
//!
//! Each RPC runs `aws ssm <operation> --output json` as a child process and
//! decodes its JSON response. Failures are recovered from the CLI's stderr
//! diagnostics.
//!
//! `send-command` takes its request on stdin (`--cli-input-json`) because a
//! transfer payload can exceed the per-argument limit of `execve`.

use crate::client::{ClientError, InvocationSnapshot, SsmApi, SubmitResponse};
use crate::types::Target;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io;
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// Request source for `--cli-input-json`.
const STDIN_INPUT: &str = "file:///dev/stdin";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct AwsCliClient {
    program: String,
    region: String,
    profile: Option<String>,
}

impl AwsCliClient {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            program: "aws".to_string(),
            region: region.into(),
            profile: None,
        }
    }

    /// Use a specific `aws` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn base_command(&self, operation: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("ssm").arg(operation);
        cmd.arg("--region").arg(&self.region);
        if let Some(ref profile) = self.profile {
            cmd.arg("--profile").arg(profile);
        }
        cmd.arg("--output").arg("json");
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run(
        &self,
        mut cmd: Command,
        operation: &str,
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, ClientError> {
        let output = match input {
            Some(input) => output_with_input(cmd, input).await,
            None => cmd.output().await,
        }
        .map_err(|source| ClientError::Launch {
            program: self.program.clone(),
            source,
        })?;

        trace!(
            operation,
            exit = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            "aws cli finished"
        );

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(operation, stderr = %stderr.trim(), "aws cli reported failure");
        Err(parse_cli_error(&stderr))
    }
}

/// Spawn `cmd`, stream `input` to its stdin and collect its output.
async fn output_with_input(mut cmd: Command, input: &[u8]) -> io::Result<Output> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // A CLI that bails out early closes the pipe; its stderr says why.
        match stdin.write_all(input).await {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
            other => other?,
        }
    }

    child.wait_with_output().await
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendCommandInput<'a> {
    document_name: &'a str,
    instance_ids: [&'a str; 1],
    parameters: CommandParameters<'a>,
}

#[derive(Debug, Serialize)]
struct CommandParameters<'a> {
    commands: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendCommandOutput {
    command: Option<CommandRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommandRecord {
    command_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCommandInvocationOutput {
    status: Option<String>,
    status_details: Option<String>,
    execution_start_date_time: Option<String>,
    execution_end_date_time: Option<String>,
    standard_output_content: Option<String>,
    standard_error_content: Option<String>,
    response_code: Option<i64>,
}

impl From<GetCommandInvocationOutput> for InvocationSnapshot {
    fn from(out: GetCommandInvocationOutput) -> Self {
        InvocationSnapshot {
            status: out.status,
            status_details: out.status_details,
            execution_start: out.execution_start_date_time,
            execution_end: out.execution_end_date_time,
            stdout: out.standard_output_content,
            stderr: out.standard_error_content,
            response_code: out.response_code,
        }
        .normalized()
    }
}

impl SsmApi for AwsCliClient {
    async fn send_command(
        &self,
        target: &Target,
        document: &str,
        payload: &str,
    ) -> Result<SubmitResponse, ClientError> {
        let request = serde_json::to_vec(&SendCommandInput {
            document_name: document,
            instance_ids: [target.as_str()],
            parameters: CommandParameters { commands: [payload] },
        })?;

        let mut cmd = self.base_command("send-command");
        cmd.arg("--cli-input-json").arg(STDIN_INPUT);

        let stdout = self.run(cmd, "send-command", Some(&request)).await?;
        let out: SendCommandOutput = serde_json::from_slice(&stdout)?;

        Ok(SubmitResponse {
            command_id: out
                .command
                .and_then(|c| c.command_id)
                .filter(|id| !id.is_empty()),
        })
    }

    async fn get_invocation(
        &self,
        command_id: &str,
        target: &Target,
    ) -> Result<InvocationSnapshot, ClientError> {
        let mut cmd = self.base_command("get-command-invocation");
        cmd.arg("--command-id").arg(command_id);
        cmd.arg("--instance-id").arg(target.as_str());

        let stdout = self.run(cmd, "get-command-invocation", None).await?;
        let out: GetCommandInvocationOutput = serde_json::from_slice(&stdout)?;
        Ok(out.into())
    }
}

/// HTTP status the service's JSON protocol attaches to an error name.
fn status_for_error_name(name: &str) -> u16 {
    match name {
        "ServiceUnavailable" => 503,
        "InternalServerError" => 500,
        _ => 400,
    }
}

/// "An error occurred (Name) when calling the Op operation (reached max retries: 4): msg"
fn service_error_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"An error occurred \(([A-Za-z0-9_.]+)\) when calling the \w+ operation(?: \(reached max retries: \d+\))?:\s*(.*)",
            )
            .ok()
        })
        .as_ref()
}

/// Recover a typed error from `aws` stderr.
pub fn parse_cli_error(stderr: &str) -> ClientError {
    let text = stderr.trim();

    if let Some(caps) = service_error_pattern().and_then(|re| re.captures(text)) {
        let name = caps[1].to_string();
        let message = caps[2].trim().to_string();
        return ClientError::Service {
            status: status_for_error_name(&name),
            name,
            message,
            request_id: None,
        };
    }

    let network_code = if text.contains("Could not connect to the endpoint URL") {
        Some("ECONNREFUSED")
    } else if text.contains("Connect timeout on endpoint URL")
        || text.contains("Read timeout on endpoint URL")
    {
        Some("ETIMEDOUT")
    } else if text.contains("Connection was closed before we received a valid response") {
        Some("ECONNRESET")
    } else if text.contains("Name or service not known")
        || text.contains("nodename nor servname provided")
        || text.contains("getaddrinfo failed")
    {
        Some("ENOTFOUND")
    } else {
        None
    };

    match network_code {
        Some(code) => ClientError::network(code, text),
        None if text.is_empty() => ClientError::other("aws cli exited with an error and no diagnostics"),
        None => ClientError::other(text),
    }
}
