use shared::error::{FeedbackEntry, FeedbackSeverity};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request was superseded or its owner navigated away.
    #[error("request cancelled")]
    Cancelled,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected http status {status}")]
    Http { status: u16, body: String },
    #[error("malformed payload: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("pattern must start with '/': {0}")]
    NotAbsolute(String),
    #[error("empty capture name in pattern {0}")]
    EmptyCapture(String),
    #[error("duplicate capture name {name} in pattern {pattern}")]
    DuplicateCapture { pattern: String, name: String },
    #[error("invalid segment {segment} in pattern {pattern}")]
    InvalidSegment { pattern: String, segment: String },
    #[error("required segment follows an optional one in pattern {0}")]
    RequiredAfterOptional(String),
    #[error("route {0} is already registered")]
    DuplicateRoute(String),
}

/// A field-addressable validation message, reported either by client-side
/// validation or by the server's feedback envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub severity: FeedbackSeverity,
    /// `None` addresses the form as a whole.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: FeedbackSeverity::Error,
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            severity: FeedbackSeverity::Error,
            field: None,
            message: message.into(),
        }
    }
}

impl From<&FeedbackEntry> for ValidationError {
    fn from(entry: &FeedbackEntry) -> Self {
        Self {
            severity: entry.severity,
            field: entry.field().map(str::to_string),
            message: entry.msg.clone(),
        }
    }
}
