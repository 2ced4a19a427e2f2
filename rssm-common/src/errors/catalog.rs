//! Error catalog and classifier.
//!
//! Any failure, from payload preparation through polling, is mapped onto an
//! [`ErrorKind`] with a display title, a detail line and an actionable
//! suggestion. Classification is total and never fails.
//!
//! # Precedence
//!
//! 1. A service-reported error (it carries an HTTP status) => `Service(..)`,
//!    sub-classified by error name or message
//! 2. A connection failure code => `Network`
//! 3. Credential-related message => `Auth`
//! 4. Permission-related message => `Permission`
//! 5. Everything else => `General`
//!
//! # Error Code Ranges
//!
//! | Range      | Kind        |
//! |------------|-------------|
//! | E100-E199  | Service     |
//! | E200-E299  | Network     |
//! | E300-E399  | Auth        |
//! | E400-E499  | Permission  |
//! | E500-E599  | General     |

use crate::client::{ClientError, NETWORK_CODES};
use crate::dispatch::{DispatchError, InvocationFailed};
use crate::payload::PrepareError;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

/// Known service error families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    InvalidInstance,
    InvalidDocument,
    InvalidParameters,
    AccessDenied,
    Throttling,
    ServiceUnavailable,
    ResourceContention,
    UnsupportedPlatform,
    AlreadyInvoked,
    /// Any other service-reported error.
    Other,
}

/// Classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "subtype", rename_all = "snake_case")]
pub enum ErrorKind {
    Service(ServiceErrorKind),
    Network,
    Auth,
    Permission,
    General,
}

impl ErrorKind {
    pub const fn code_number(&self) -> u16 {
        match self {
            Self::Service(sub) => match sub {
                ServiceErrorKind::InvalidInstance => 101,
                ServiceErrorKind::InvalidDocument => 102,
                ServiceErrorKind::InvalidParameters => 103,
                ServiceErrorKind::AccessDenied => 104,
                ServiceErrorKind::Throttling => 105,
                ServiceErrorKind::ServiceUnavailable => 106,
                ServiceErrorKind::ResourceContention => 107,
                ServiceErrorKind::UnsupportedPlatform => 108,
                ServiceErrorKind::AlreadyInvoked => 109,
                ServiceErrorKind::Other => 100,
            },
            Self::Network => 200,
            Self::Auth => 300,
            Self::Permission => 400,
            Self::General => 500,
        }
    }

    /// Error code in the `RSSM-Exxx` format.
    pub fn code_string(&self) -> String {
        format!("RSSM-E{:03}", self.code_number())
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Service(sub) => match sub {
                ServiceErrorKind::InvalidInstance => "AWS SSM Instance Error",
                ServiceErrorKind::InvalidDocument => "AWS SSM Document Error",
                ServiceErrorKind::InvalidParameters => "AWS SSM Parameter Error",
                ServiceErrorKind::AccessDenied => "AWS IAM Permission Error",
                ServiceErrorKind::Throttling => "AWS API Throttling Error",
                ServiceErrorKind::ServiceUnavailable => "AWS Service Availability Error",
                ServiceErrorKind::ResourceContention => "AWS Resource Contention Error",
                ServiceErrorKind::UnsupportedPlatform => "AWS SSM Platform Error",
                ServiceErrorKind::AlreadyInvoked => "AWS SSM Invocation Error",
                ServiceErrorKind::Other => "AWS SSM API Error",
            },
            Self::Network => "Network Connectivity Error",
            Self::Auth => "AWS Authentication Error",
            Self::Permission => "AWS Permission Error",
            Self::General => "General Operation Error",
        }
    }

    /// Default suggestion for the kind.
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::Service(sub) => match sub {
                ServiceErrorKind::InvalidInstance => {
                    "The specified instance ID is invalid or the SSM Agent is not running on the instance. Verify the instance ID and check that the SSM Agent is installed, running, and has proper connectivity."
                }
                ServiceErrorKind::InvalidDocument => {
                    "The SSM document specified is invalid. Check document name and ensure it's compatible with the instance's platform."
                }
                ServiceErrorKind::InvalidParameters => {
                    "One or more parameters provided to the command are invalid. Check parameter format and values."
                }
                ServiceErrorKind::AccessDenied => {
                    "Access denied. Your IAM user/role needs ssm:SendCommand and ssm:GetCommandInvocation permissions. Check your IAM policy and/or resource-level permissions."
                }
                ServiceErrorKind::Throttling => {
                    "API request throttling detected. Reduce request frequency or wait before retrying."
                }
                ServiceErrorKind::ServiceUnavailable => {
                    "AWS SSM service is temporarily unavailable. This is usually a transient error - please wait a few minutes and try again."
                }
                ServiceErrorKind::ResourceContention => {
                    "Too many concurrent updates to AWS resources. Wait a few minutes and retry your command."
                }
                ServiceErrorKind::UnsupportedPlatform => {
                    "The instance platform is not supported for this operation. Verify instance operating system compatibility."
                }
                ServiceErrorKind::AlreadyInvoked => {
                    "The command has already been invoked. Check the status of the existing command instead of resending it."
                }
                ServiceErrorKind::Other => {
                    "The AWS SSM API rejected the request. Check the error name and message above, then verify your inputs and AWS configuration."
                }
            },
            Self::Network => {
                "Check your internet connection and VPN status. Ensure you can reach AWS SSM endpoints at ssm.[region].amazonaws.com."
            }
            Self::Auth => {
                "Ensure you have valid AWS credentials configured. Check your AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY environment variables, ~/.aws/credentials file, or use AWS SSO sign-in."
            }
            Self::Permission => {
                "You may not have permission to perform this action. For AWS calls your IAM role/user needs ssm:SendCommand and ssm:GetCommandInvocation permissions plus EC2 instance resource permissions; for local files check file permissions."
            }
            Self::General => {
                "Check your AWS configuration and try again. For detailed diagnostics, re-run with --verbose (or RSSM_LOG_LEVEL=debug)."
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the operator is told about a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: ErrorKind,
    pub code: String,
    /// Display title, e.g. `AWS SSM API Error (400)`.
    pub title: String,
    /// Underlying cause, formatted with whatever context is available.
    pub detail: String,
    pub suggestion: String,
}

impl Classification {
    fn new(kind: ErrorKind, title: String, detail: String, suggestion: &str) -> Self {
        Self {
            kind,
            code: kind.code_string(),
            title,
            detail,
            suggestion: suggestion.to_string(),
        }
    }

    /// One-line form for logs.
    pub fn format_brief(&self) -> String {
        format!("[{}] {}: {}", self.code, self.title, self.detail)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_brief())
    }
}

struct ServiceSignal<'a> {
    name: &'a str,
    status: u16,
    message: &'a str,
    request_id: Option<&'a str>,
}

/// Classify a failure by inspecting its whole source chain.
pub fn classify(err: &(dyn StdError + 'static)) -> Classification {
    let chain: Vec<&(dyn StdError + 'static)> =
        std::iter::successors(Some(err), |e| (*e).source()).collect();

    let full_message = chain
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ");
    let client = chain
        .iter()
        .find_map(|e| e.downcast_ref::<ClientError>());

    if let Some(ClientError::Service {
        name,
        status,
        message,
        request_id,
    }) = client
    {
        return classify_service(ServiceSignal {
            name,
            status: *status,
            message,
            request_id: request_id.as_deref(),
        });
    }

    if let Some(code) = network_code(&chain) {
        let message = chain.last().map(|e| e.to_string()).unwrap_or_default();
        return Classification::new(
            ErrorKind::Network,
            ErrorKind::Network.name().to_string(),
            format!("Network error: {code} - {message} (Unable to reach AWS SSM endpoints)"),
            ErrorKind::Network.suggestion(),
        );
    }

    let lowered = full_message.to_lowercase();

    if ["credential", "could not be refreshed"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        return Classification::new(
            ErrorKind::Auth,
            ErrorKind::Auth.name().to_string(),
            format!("AWS credential error: {full_message} (Check AWS credentials configuration)"),
            ErrorKind::Auth.suggestion(),
        );
    }

    if ["permission", "not authorized"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        return Classification::new(
            ErrorKind::Permission,
            ErrorKind::Permission.name().to_string(),
            format!("Permission error: {full_message} (Access policy may be too restrictive)"),
            ErrorKind::Permission.suggestion(),
        );
    }

    Classification::new(
        ErrorKind::General,
        ErrorKind::General.name().to_string(),
        full_message,
        general_suggestion(&chain),
    )
}

/// Classify an `anyhow` error chain.
pub fn classify_anyhow(err: &anyhow::Error) -> Classification {
    classify(err.as_ref())
}

fn service_kind(name: &str, status: u16, message: &str) -> ServiceErrorKind {
    let lowered = message.to_lowercase();
    let named = |n: &str| name == n || message.contains(n);

    if named("InvalidInstanceId") {
        ServiceErrorKind::InvalidInstance
    } else if named("InvalidDocument") {
        ServiceErrorKind::InvalidDocument
    } else if named("InvalidParameters")
        || (lowered.contains("parameter") && lowered.contains("invalid"))
    {
        ServiceErrorKind::InvalidParameters
    } else if name == "AccessDeniedException" || message.contains("AccessDenied") {
        ServiceErrorKind::AccessDenied
    } else if name == "ThrottlingException" || lowered.contains("throttl") {
        ServiceErrorKind::Throttling
    } else if name == "ServiceUnavailable" || status == 503 {
        ServiceErrorKind::ServiceUnavailable
    } else if named("TooManyUpdates") {
        ServiceErrorKind::ResourceContention
    } else if name == "UnsupportedPlatformType"
        || (lowered.contains("platform") && lowered.contains("support"))
    {
        ServiceErrorKind::UnsupportedPlatform
    } else if name == "DuplicateInstanceId"
        || name == "CommandAlreadyInvoked"
        || lowered.contains("already invoked")
    {
        ServiceErrorKind::AlreadyInvoked
    } else {
        ServiceErrorKind::Other
    }
}

fn classify_service(signal: ServiceSignal<'_>) -> Classification {
    let sub = service_kind(signal.name, signal.status, signal.message);
    let kind = ErrorKind::Service(sub);
    let request_id = signal.request_id.unwrap_or("Unknown");
    let status = signal.status;

    let explanation = match sub {
        ServiceErrorKind::InvalidInstance => Some("Instance ID invalid or not managed by SSM"),
        ServiceErrorKind::ResourceContention => {
            Some("Too many concurrent updates to AWS resources")
        }
        ServiceErrorKind::Throttling => Some("API rate limit exceeded"),
        ServiceErrorKind::AccessDenied => {
            Some("IAM permissions insufficient for this operation")
        }
        ServiceErrorKind::InvalidParameters => Some("Invalid parameters in command execution"),
        _ => None,
    };

    let detail = match explanation {
        Some(text) => format!("AWS SSM Error ({status}): {text}. RequestId: {request_id}"),
        None => format!(
            "AWS Error {status}: {} - {}. RequestId: {request_id}",
            signal.name, signal.message
        ),
    };

    let title = match sub {
        ServiceErrorKind::Other => format!("{} ({status})", kind.name()),
        _ => kind.name().to_string(),
    };

    Classification::new(kind, title, detail, kind.suggestion())
}

fn network_code(chain: &[&(dyn StdError + 'static)]) -> Option<String> {
    for err in chain {
        if let Some(ClientError::Network { code, .. }) = err.downcast_ref::<ClientError>()
            && NETWORK_CODES.contains(&code.as_str())
        {
            return Some(code.clone());
        }
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            let code = match io.kind() {
                std::io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
                std::io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
                std::io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
                _ => None,
            };
            if let Some(code) = code {
                return Some(code.to_string());
            }
        }
    }
    None
}

/// Suggestions for failures we raise ourselves.
fn general_suggestion(chain: &[&(dyn StdError + 'static)]) -> &'static str {
    for err in chain {
        if let Some(prepare) = err.downcast_ref::<PrepareError>() {
            return match prepare {
                PrepareError::Io { .. } => {
                    "Check that the local file exists and is readable, and that the path is correct."
                }
                PrepareError::InvalidRemotePath { .. } => {
                    "Use an absolute remote file path without quotes, backslashes, '$' or backticks, e.g. /home/ec2-user/app.conf."
                }
                PrepareError::EmptyCommand => "Provide a non-empty command with --command.",
            };
        }
        if let Some(DispatchError::MissingInvocationId { .. }) = err.downcast_ref::<DispatchError>()
        {
            return "This could be an AWS service issue. Try again later or check the AWS SSM service status.";
        }
        if err.downcast_ref::<InvocationFailed>().is_some() {
            return "Check the output above for error details. There may be information in the standard error output.";
        }
        if let Some(ClientError::Launch { source, .. }) = err.downcast_ref::<ClientError>() {
            if source.kind() == std::io::ErrorKind::ArgumentListTooLong {
                return "The request was too large to hand to the AWS CLI. Transfer a smaller file or split it into parts.";
            }
            return "Install the AWS CLI (https://aws.amazon.com/cli/) or point RSSM_AWS_BIN at the aws executable.";
        }
    }
    ErrorKind::General.suggestion()
}
