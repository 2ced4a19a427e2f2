//! Runtime configuration.
//!
//! Settings come from `RSSM_*` environment variables with built-in
//! defaults; command-line flags override both. Source tracking makes it
//! possible to log where each effective value came from.

pub mod env;
pub mod source;

pub use env::{EnvError, EnvParser, is_valid_region};
pub use source::{ConfigSource, Sourced};

use crate::logging::LogFormat;
use std::path::PathBuf;

/// Region used when neither `RSSM_REGION` nor `--region` is given.
pub const DEFAULT_REGION: &str = "ap-southeast-1";

/// Executable used to talk to the service.
pub const DEFAULT_AWS_BIN: &str = "aws";

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Effective settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub region: Sourced<String>,
    pub profile: Sourced<Option<String>>,
    pub aws_bin: Sourced<String>,
    pub log_level: Sourced<String>,
    pub log_format: Sourced<LogFormat>,
    pub log_file: Sourced<Option<PathBuf>>,
}

impl Settings {
    /// Read settings from the environment. Invalid values fall back to
    /// defaults and are returned alongside for reporting.
    pub fn from_env() -> (Self, Vec<EnvError>) {
        let mut parser = EnvParser::new();

        let format = parser.get_choice("LOG_FORMAT", &["pretty", "json"], "pretty");
        let log_format = Sourced {
            value: if format.value == "json" {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            source: format.source,
            origin: format.origin,
        };

        let settings = Self {
            region: parser.get_region("REGION", DEFAULT_REGION),
            profile: parser.get_optional_string("PROFILE"),
            aws_bin: parser.get_string("AWS_BIN", DEFAULT_AWS_BIN),
            log_level: parser.get_log_level("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_format,
            log_file: parser.get_optional_path("LOG_FILE"),
        };

        (settings, parser.take_errors())
    }

    /// Apply `--region`, rejecting malformed names.
    pub fn with_region(mut self, region: Option<String>) -> Result<Self, EnvError> {
        if let Some(ref value) = region
            && !is_valid_region(value)
        {
            return Err(EnvError::InvalidValue {
                var: "--region".to_string(),
                expected: "AWS region name (e.g. ap-southeast-1)".to_string(),
                value: value.clone(),
            });
        }
        self.region = self.region.overridden(region, "--region");
        Ok(self)
    }

    /// Apply `--profile`.
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = self.profile.overridden(profile.map(Some), "--profile");
        self
    }
}
