//! Error taxonomy shared by the search adapter and the store.
//!
//! Every failure that reaches the store is normalized into a [`SearchError`],
//! which is cheap to clone so it can sit in the store's error slot and travel
//! through the event bus.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse classification used by the UI to pick a retry affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Validation,
    Server,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected error: {message}")]
    Unknown { message: String },
}

impl SearchError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    pub fn server(status: u16, msg: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: msg.into(),
        }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown {
            message: msg.into(),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Validation { .. } | Self::Unknown { .. } => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::server(status.as_u16(), err.to_string());
        }
        if err.is_timeout() {
            return Self::network(format!("request timed out: {err}"));
        }
        if err.is_decode() {
            return Self::unknown(format!("malformed response body: {err}"));
        }
        if err.is_connect() || err.is_request() || err.is_body() {
            return Self::network(err.to_string());
        }
        Self::unknown(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        Self::validation(format!("invalid JSON document: {err}"))
    }
}

impl From<url::ParseError> for SearchError {
    fn from(err: url::ParseError) -> Self {
        Self::unknown(format!("invalid request URL: {err}"))
    }
}
