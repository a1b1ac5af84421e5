use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
/// Errors returned by this crate.
///
/// Callers can tell a timeout apart from other transport failures either by
/// matching [`SvnError::Timeout`] or with [`SvnError::is_timeout`]; the rendered
/// message of a timeout always contains `timed out`.
pub enum SvnError {
    /// The provided server URL is syntactically invalid or unsupported.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    /// The provided repository path is invalid (checked locally, never sent).
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A connection parameter is missing or malformed.
    #[error("invalid connection parameter: {0}")]
    InvalidConfig(String),
    /// The path does not exist at the requested revision.
    #[error("not found: {0}")]
    NotFound(String),
    /// A network call exceeded the configured timeout budget.
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// The server could not be reached (DNS, refused connection, TLS, reset).
    #[error("server unreachable: {0}")]
    Unreachable(String),
    /// The server rejected the configured credentials.
    #[error("auth failed: {0}")]
    AuthFailed(String),
    /// The session was closed before the operation was issued.
    #[error("session closed")]
    SessionClosed,
    /// The server answered with an unexpected HTTP status.
    #[error("http {status}: {context}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// The request that failed (method and path).
        context: String,
    },
    /// The server response did not match the expected WebDAV shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SvnError {
    /// Returns `true` if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Returns `true` if this error reports a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Classifies a transport error; `context` names the request that failed.
    pub(crate) fn from_transport(err: reqwest::Error, context: &str) -> Self {
        // Connect timeouts report both `is_connect` and `is_timeout`.
        if err.is_timeout() {
            Self::Timeout(format!("{context} timed out"))
        } else if err.is_connect() {
            Self::Unreachable(format!("{context}: {}", error_chain(&err)))
        } else if err.is_builder() {
            Self::InvalidUrl(format!("{context}: {err}"))
        } else if err.is_redirect() || err.is_decode() {
            Self::Protocol(format!("{context}: {}", error_chain(&err)))
        } else {
            Self::Unreachable(format!("{context}: {}", error_chain(&err)))
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
