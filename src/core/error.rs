// src/core/error.rs

use thiserror::Error;

/// Fatal pre-scan errors. When one of these occurs no report is produced
/// and the reason is surfaced directly to the operator.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid target URL `{url}`: {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("unknown test id `{0}`")]
    UnknownTestId(String),

    #[error("no tests selected")]
    NoTestsSelected,

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Classification of a transport-level failure. Recovered per probe and
/// recorded in the report's `failures`, never aborting the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Timeout,
    Tls,
    Other,
}

/// A failed network call, normalized so probes can treat it as a
/// first-class outcome rather than a crash.
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&reqwest::Error> for TransportError {
    fn from(err: &reqwest::Error) -> Self {
        let msg = err.to_string();
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            // reqwest folds DNS and TLS failures into connect errors;
            // keep the distinction where the message makes it explicit.
            if msg.contains("dns") || msg.contains("resolve") {
                TransportErrorKind::Dns
            } else if msg.contains("certificate") || msg.contains("tls") {
                TransportErrorKind::Tls
            } else {
                TransportErrorKind::Connect
            }
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, msg)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::from(&err)
    }
}
