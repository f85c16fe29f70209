//! Error taxonomy for a visit authorization attempt
//!
//! Every variant is terminal: the flow stops at the first error and the
//! caller decides whether a fresh attempt is worthwhile.

use std::fmt;
use thiserror::Error;

/// The round trip an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// GET of the login page
    LoginPage,
    /// POST of the username with the page tokens
    Prelogin,
    /// JSON POST of the password
    Authenticate,
    /// Final visitor form POST
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoginPage => "login page",
            Stage::Prelogin => "prelogin",
            Stage::Authenticate => "authenticate",
            Stage::Submit => "submit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum VisitError {
    /// Initial GET failed or returned a page we cannot work with
    #[error("login page unavailable{}: {reason}", http_suffix(.status))]
    LoginPageUnavailable { status: Option<u16>, reason: String },

    /// A required hidden field was absent from the login page
    #[error("login page is missing hidden field {field}")]
    MissingToken { field: &'static str },

    /// Network-level failure (DNS, connect, TLS, timeout, body read)
    #[error("transport error during {stage}: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: reqwest::Error,
    },

    /// A login round trip answered with a non-success status
    #[error("unexpected HTTP {status} during {stage}")]
    UnexpectedStatus { stage: Stage, status: u16 },

    /// Login completed but the session was not accepted at submission time
    #[error("authentication rejected: {reason}")]
    AuthenticationRejected { reason: String },

    /// Submission response did not carry the success marker
    #[error("visitor authorization rejected (HTTP {status}): {excerpt}")]
    AuthorizationRejected { status: u16, excerpt: String },

    /// A value destined for a request header is not a valid header value
    #[error("invalid request header during {stage}: {source}")]
    InvalidHeader {
        stage: Stage,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    /// Visitor details could not be encoded into the form payload
    #[error("failed to encode visitor details: {0}")]
    Encode(#[from] serde_json::Error),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl VisitError {
    pub(crate) fn transport(stage: Stage, source: reqwest::Error) -> Self {
        VisitError::Transport { stage, source }
    }

    /// Stage that produced this error
    pub fn stage(&self) -> Stage {
        match self {
            VisitError::LoginPageUnavailable { .. } | VisitError::MissingToken { .. } => {
                Stage::LoginPage
            }
            VisitError::Transport { stage, .. }
            | VisitError::UnexpectedStatus { stage, .. }
            | VisitError::InvalidHeader { stage, .. } => *stage,
            VisitError::AuthenticationRejected { .. }
            | VisitError::AuthorizationRejected { .. }
            | VisitError::Encode(_) => Stage::Submit,
        }
    }

    /// True when the underlying transport gave up on a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, VisitError::Transport { source, .. } if source.is_timeout())
    }
}
