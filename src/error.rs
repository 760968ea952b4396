use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

/// Failure of a single page fetch.
///
/// Both variants are retriable through a refresh or reset. The cause chain of the
/// underlying transport error is flattened into `cause` so the value stays `Clone`
/// and can travel across the worker channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{message}")]
    Network {
        message: String,
        cause: Option<String>,
    },
    #[error("{message}")]
    Api {
        status: Option<u16>,
        message: String,
        cause: Option<String>,
    },
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        FetchError::Network {
            message: message.into(),
            cause: None,
        }
    }

    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        FetchError::Api {
            status,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(self, cause: impl Into<String>) -> Self {
        let cause = Some(cause.into());
        match self {
            FetchError::Network { message, .. } => FetchError::Network { message, cause },
            FetchError::Api {
                status, message, ..
            } => FetchError::Api {
                status,
                message,
                cause,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Network { .. } => ErrorKind::Network,
            FetchError::Api { .. } => ErrorKind::Api,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FetchError::Network { message, .. } | FetchError::Api { message, .. } => message,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            FetchError::Network { cause, .. } | FetchError::Api { cause, .. } => cause.as_deref(),
        }
    }

    /// Classifies a transport error: connectivity and timeouts are network failures,
    /// status and decode failures are API rejections.
    pub fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let cause = cause_chain(&err);
        let base = if err.is_timeout() {
            FetchError::network(format!("{context}: request timed out"))
        } else if err.is_connect() {
            FetchError::network(format!("{context}: connection failed"))
        } else if err.is_decode() {
            FetchError::api(status, format!("{context}: malformed payload"))
        } else if err.is_status() {
            FetchError::api(status, format!("{context}: unexpected status"))
        } else if err.is_body() || err.is_request() {
            FetchError::network(format!("{context}: transfer failed"))
        } else {
            FetchError::api(status, format!("{context}: request rejected"))
        };
        base.with_cause(cause)
    }
}

/// Joins an error and all of its sources into one line.
pub fn cause_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Api,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => f.write_str("network error"),
            ErrorKind::Api => f.write_str("api error"),
        }
    }
}

/// Snapshot form of the last fetch failure, as shown to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub cause: Option<String>,
}

impl From<&FetchError> for ErrorInfo {
    fn from(err: &FetchError) -> Self {
        ErrorInfo {
            kind: err.kind(),
            message: err.message().to_string(),
            cause: err.cause().map(str::to_string),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({cause})")?;
        }
        Ok(())
    }
}
