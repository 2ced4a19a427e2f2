//! Core library for rssm.
//!
//! Prepares shell payloads, submits them to an EC2 instance through the
//! Systems Manager command service, polls the invocation until it settles
//! and turns the outcome (or any failure on the way) into an operator report.

pub mod aws_cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod mock;
pub mod payload;
pub mod report;
pub mod types;
pub mod util;

pub use aws_cli::AwsCliClient;
pub use client::{ClientError, InvocationSnapshot, RUN_SHELL_SCRIPT_DOCUMENT, SsmApi, SubmitResponse};
pub use config::{ConfigSource, EnvError, Settings, Sourced};
pub use dispatch::{DispatchError, Dispatcher, Invocation, InvocationFailed, OutputAccumulator};
pub use errors::{Classification, ErrorKind, ServiceErrorKind, classify, classify_anyhow};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use payload::{Payload, PrepareError, SudoStatus, TransferInfo};
pub use report::{
    Report, error_json, render_error, render_info, render_report, render_summary, report_json,
};
pub use types::{ExecutionWindow, InvocationStatus, OperationKind, Target, format_file_size};
