//! Error kinds produced by a single poll.
//!
//! None of these escape the orchestrator: every variant is turned into a
//! status string there. Malformed rows are not errors at all; the parser
//! skips and counts them.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Request could not be sent or the body could not be read.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Server answered with a non-2xx status.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// Endpoint in the source configuration is not a usable URL.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    /// Well-formed response without any line after the header.
    #[error("no data rows after header")]
    ParseEmpty,

    /// Data lines exist but none of them yielded a usable row
    /// (only raised under the strict empty policy).
    #[error("{skipped} data line(s), none usable")]
    NoValidRows { skipped: usize },
}

impl FetchError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NetworkFailure(_) => "network",
            FetchError::HttpStatus(_) => "http_status",
            FetchError::InvalidEndpoint(_) => "invalid_endpoint",
            FetchError::ParseEmpty => "parse_empty",
            FetchError::NoValidRows { .. } => "no_valid_rows",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => FetchError::HttpStatus(status.as_u16()),
            None => FetchError::NetworkFailure(e.to_string()),
        }
    }
}
