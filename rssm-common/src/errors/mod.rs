//! Failure classification for operator-facing reports.
//!
//! Every failure a run can hit (payload preparation, submission, polling,
//! or a non-success terminal status) is mapped to an [`ErrorKind`] with an
//! `RSSM-Exxx` code and a remediation hint.

pub mod catalog;

pub use catalog::{
    Classification, ErrorKind, ServiceErrorKind, classify, classify_anyhow,
};
