//! Final run report and its text rendering.
//!
//! Rendering never touches process-wide streams; callers pass the writer.

use crate::dispatch::{Invocation, OutputAccumulator};
use crate::errors::Classification;
use crate::types::{ExecutionWindow, InvocationStatus, OperationKind, Target, format_file_size};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;
use std::io::{self, Write};

const KEY_WIDTH: usize = 20;
const RULE_WIDTH: usize = 60;

/// Immutable record of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub command_id: String,
    pub target: Target,
    pub operation: OperationKind,
    pub window: ExecutionWindow,
    /// Wall-clock seconds from submission to loop exit.
    pub duration_secs: f64,
    pub output: String,
    pub status: InvocationStatus,
    /// False for fire-and-forget runs; `status` is then `Pending`.
    pub waited: bool,
    pub responded_at: DateTime<Utc>,
}

impl Report {
    pub(crate) fn from_invocation(
        invocation: Invocation,
        status: InvocationStatus,
        acc: OutputAccumulator,
        waited: bool,
    ) -> Self {
        let duration_secs = invocation.submitted_at.elapsed().as_secs_f64();
        let window = ExecutionWindow {
            start: acc
                .window()
                .start
                .clone()
                .or_else(|| Some(utc_timestamp(&invocation.submitted_wall))),
            end: acc.window().end.clone(),
        };

        Self {
            command_id: invocation.command_id,
            target: invocation.target,
            operation: invocation.operation,
            window,
            duration_secs,
            output: acc.output(),
            status,
            waited,
            responded_at: Utc::now(),
        }
    }

    /// A fire-and-forget submission counts as success; a waited run must end in `Success`.
    pub fn is_success(&self) -> bool {
        !self.waited || self.status == InvocationStatus::Success
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn duration_label(&self) -> String {
        format!("{:.2} seconds", self.duration_secs)
    }

    /// Metadata lines shown above the output body.
    pub fn metadata(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("Command ID", self.command_id.clone()),
            ("Target Instance", self.target.to_string()),
            ("Operation", self.operation.label().to_string()),
            (
                "Execution Start",
                self.window.start.clone().unwrap_or_else(|| "Unknown".to_string()),
            ),
            (
                "Execution End",
                self.window.end.clone().unwrap_or_else(|| "Unknown".to_string()),
            ),
            ("Duration", self.duration_label()),
            ("Response Time", local_timestamp(&self.responded_at)),
            ("Response Time (UTC)", utc_timestamp(&self.responded_at)),
        ];

        if let OperationKind::FileTransfer {
            source,
            destination,
            size_bytes,
        } = &self.operation
        {
            pairs.push(("Source File", source.display().to_string()));
            pairs.push(("Destination File", destination.clone()));
            pairs.push(("File Size", format_file_size(*size_bytes)));
        }

        pairs
    }
}

/// `Oct 16, 2026, 10:04:05` in the local timezone.
pub fn local_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%b %-d, %Y, %H:%M:%S")
        .to_string()
}

/// ISO-8601 UTC with millisecond precision.
pub fn utc_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_header<W: Write>(w: &mut W, title: &str, at: &DateTime<Utc>) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "=== {} ({}) ===", title, local_timestamp(at))
}

fn write_pair<W: Write>(w: &mut W, key: &str, value: &str) -> io::Result<()> {
    writeln!(w, "{:<width$}: {}", key, value, width = KEY_WIDTH)
}

/// Titled block of key/value lines.
pub fn render_info<W: Write>(w: &mut W, title: &str, pairs: &[(&str, String)]) -> io::Result<()> {
    write_header(w, title, &Utc::now())?;
    for (key, value) in pairs {
        write_pair(w, key, value)?;
    }
    writeln!(w)
}

/// Render a report: the output block for waited runs followed by the summary.
pub fn render_report<W: Write>(w: &mut W, report: &Report) -> io::Result<()> {
    if report.waited {
        render_output(w, report)?;
    }
    render_summary(w, report)
}

fn render_output<W: Write>(w: &mut W, report: &Report) -> io::Result<()> {
    write_header(w, "COMMAND OUTPUT", &report.responded_at)?;
    for (key, value) in report.metadata() {
        write_pair(w, key, &value)?;
    }

    writeln!(w)?;
    writeln!(w, "Status: {}", report.status)?;
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))?;

    let body = report.output.trim();
    if body.is_empty() {
        // Both silent outcomes are possible; the report does not guess which.
        writeln!(w, "No output returned from command.")?;
        writeln!(
            w,
            "This may indicate the command executed successfully without any output,"
        )?;
        writeln!(
            w,
            "or that the command failed silently without generating an error."
        )?;
    } else {
        writeln!(w, "Output ({} lines):", body.lines().count())?;
        writeln!(w, "{}", body)?;
    }

    writeln!(w, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(w)
}

/// Closing block: "initiated" for fire-and-forget runs, "completed" for a
/// successful waited run, nothing otherwise.
pub fn render_summary<W: Write>(w: &mut W, report: &Report) -> io::Result<()> {
    let transfer = matches!(report.operation, OperationKind::FileTransfer { .. });

    if !report.waited {
        let (title, message) = if transfer {
            (
                "SUCCESS - FILE TRANSFER INITIATED",
                "File transfer initiated successfully, but not waiting for results",
            )
        } else {
            (
                "SUCCESS - COMMAND INITIATED",
                "Command initiated successfully, but not waiting for results",
            )
        };
        return render_info(
            w,
            title,
            &[
                ("Message", message.to_string()),
                ("Command ID", report.command_id.clone()),
                ("Target Instance", report.target.to_string()),
                (
                    "Note",
                    "To check results later, use AWS console or AWS CLI with the Command ID"
                        .to_string(),
                ),
            ],
        );
    }

    if report.status != InvocationStatus::Success {
        return Ok(());
    }

    let mut pairs = vec![
        ("Status", report.status.to_string()),
        ("Command ID", report.command_id.clone()),
        ("Target Instance", report.target.to_string()),
        ("Duration", report.duration_label()),
    ];
    let title = match &report.operation {
        OperationKind::CommandExecution => {
            let length = report.output.trim().chars().count();
            pairs.push(("Output Length", format!("{length} characters")));
            "EXECUTION COMPLETED SUCCESSFULLY"
        }
        OperationKind::FileTransfer {
            source,
            destination,
            ..
        } => {
            pairs.push(("Source File", source.display().to_string()));
            pairs.push(("Destination File", destination.clone()));
            "FILE TRANSFER COMPLETED SUCCESSFULLY"
        }
    };
    render_info(w, title, &pairs)
}

/// Operator-facing error block. `context` says which step failed.
pub fn render_error<W: Write>(
    w: &mut W,
    context: &str,
    classification: &Classification,
) -> io::Result<()> {
    writeln!(w)?;
    writeln!(w, "=== ERROR: {} ===", classification.title)?;
    writeln!(w, "\u{274c} {}", context)?;
    writeln!(w)?;
    writeln!(w, "{}", classification.detail)?;
    writeln!(w)?;
    writeln!(w, "\u{1f4a1} SUGGESTION: {}", classification.suggestion)?;
    writeln!(w)?;
    writeln!(w, "=== END OF ERROR REPORT ({}) ===", classification.code)?;
    writeln!(w)
}

fn error_fields(context: &str, classification: &Classification) -> serde_json::Value {
    serde_json::json!({
        "code": classification.code,
        "kind": classification.kind,
        "title": classification.title,
        "message": context,
        "detail": classification.detail,
        "suggestion": classification.suggestion,
    })
}

/// Machine-readable error object for `--json` mode.
pub fn error_json(context: &str, classification: &Classification) -> serde_json::Value {
    serde_json::json!({ "error": error_fields(context, classification) })
}

/// The report as one JSON object, carrying an `error` member when the run failed.
pub fn report_json(
    report: &Report,
    failure: Option<(&str, &Classification)>,
) -> serde_json::Result<serde_json::Value> {
    let mut value = serde_json::to_value(report)?;
    if let (Some((context, classification)), Some(fields)) = (failure, value.as_object_mut()) {
        fields.insert("error".to_string(), error_fields(context, classification));
    }
    Ok(value)
}
