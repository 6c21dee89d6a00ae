// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for visibilitybot

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for visibilitybot
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Snapshot has no {0} capture")]
    MissingCapture(&'static str),

    #[error("Response rejected: {0}")]
    InvalidResponse(String),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Audit cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is the cancellation control-flow signal.
    ///
    /// Cancellation must propagate through the check error boundary
    /// instead of being converted into an errored check result.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
