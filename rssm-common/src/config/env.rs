//! Environment variable parsing with type safety.
//!
//! Every variable carries the `RSSM_` prefix. Parse problems are collected
//! instead of aborting so all of them can be reported at once; the affected
//! setting falls back to its default.

use super::source::Sourced;
use regex::Regex;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur during environment variable parsing.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Invalid value for a variable.
    #[error("Invalid value for {var}: expected {expected}, got '{value}'")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    /// Invalid log level.
    #[error("Invalid log level for {var}: {value}")]
    InvalidLogLevel { var: String, value: String },
}

/// `ap-southeast-1`, `us-gov-west-1`, `eusc-de-east-1`.
pub fn is_valid_region(region: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z]{2,}(-[a-z]+)+-\d+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(region))
}

/// Type-safe environment variable parser.
pub struct EnvParser {
    prefix: &'static str,
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self {
            prefix: "RSSM_",
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Non-empty value of a variable; empty counts as unset.
    fn read(&self, var_name: &str) -> Option<String> {
        env::var(var_name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get a string value with default.
    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match self.read(&var_name) {
            Some(value) => Sourced::from_env(value, var_name),
            None => Sourced::default_value(default.to_string()),
        }
    }

    /// Get an optional string (None if not set or empty).
    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        let var_name = self.var_name(name);
        match self.read(&var_name) {
            Some(value) => Sourced::from_env(Some(value), var_name),
            None => Sourced::default_value(None),
        }
    }

    /// Get an optional path with `~/` expansion.
    pub fn get_optional_path(&mut self, name: &str) -> Sourced<Option<PathBuf>> {
        let var_name = self.var_name(name);
        match self.read(&var_name) {
            Some(value) => {
                let expanded = match (value.strip_prefix("~/"), dirs::home_dir()) {
                    (Some(rest), Some(home)) => home.join(rest),
                    _ => PathBuf::from(&value),
                };
                Sourced::from_env(Some(expanded), var_name)
            }
            None => Sourced::default_value(None),
        }
    }

    /// Get a log level value with validation.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match self.read(&var_name) {
            Some(value) => {
                let lower = value.to_lowercase();
                match lower.as_str() {
                    "trace" | "debug" | "info" | "warn" | "error" | "off" => {
                        Sourced::from_env(lower, var_name)
                    }
                    _ => {
                        self.errors.push(EnvError::InvalidLogLevel {
                            var: var_name,
                            value,
                        });
                        Sourced::default_value(default.to_string())
                    }
                }
            }
            None => Sourced::default_value(default.to_string()),
        }
    }

    /// Get one of a fixed set of lowercase choices.
    pub fn get_choice(
        &mut self,
        name: &str,
        choices: &[&'static str],
        default: &'static str,
    ) -> Sourced<&'static str> {
        let var_name = self.var_name(name);
        let Some(value) = self.read(&var_name) else {
            return Sourced::default_value(default);
        };
        let lower = value.to_lowercase();
        match choices.iter().find(|c| **c == lower) {
            Some(choice) => Sourced::from_env(*choice, var_name),
            None => {
                self.errors.push(EnvError::InvalidValue {
                    var: var_name,
                    expected: format!("one of {}", choices.join("/")),
                    value,
                });
                Sourced::default_value(default)
            }
        }
    }

    /// Get an AWS region name.
    pub fn get_region(&mut self, name: &str, default: &str) -> Sourced<String> {
        let var_name = self.var_name(name);
        match self.read(&var_name) {
            Some(value) if is_valid_region(&value) => Sourced::from_env(value, var_name),
            Some(value) => {
                self.errors.push(EnvError::InvalidValue {
                    var: var_name,
                    expected: "AWS region name (e.g. ap-southeast-1)".to_string(),
                    value,
                });
                Sourced::default_value(default.to_string())
            }
            None => Sourced::default_value(default.to_string()),
        }
    }
}

impl Default for EnvParser {
    fn default() -> Self {
        Self::new()
    }
}
