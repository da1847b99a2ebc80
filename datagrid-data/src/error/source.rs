//! Data source error types

/// Errors returned by a [`DataSource`](crate::source::DataSource).
///
/// Sources may fail for any reason; the grid surfaces these values verbatim
/// to its error channels and only extracts a human message through
/// [`SourceError::message_or`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// HTTP error response from a remote backend.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message (may be empty).
        message: String,
        /// Backend error code, if available.
        code: Option<String>,
        /// Raw response payload, if available.
        payload: Option<serde_json::Value>,
    },

    /// The backend rejected the request with a message.
    #[error("{0}")]
    Rejected(String),

    /// The request was cancelled before it resolved.
    #[error("Request cancelled")]
    Cancelled,

    /// Something unexpected failed inside the operation.
    #[error("Unexpected error")]
    Unexpected(Option<String>),
}

impl SourceError {
    /// Creates a new HTTP error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            code: None,
            payload: None,
        }
    }

    /// Creates a new HTTP error carrying the raw response payload.
    pub fn http_with_payload(status: u16, payload: serde_json::Value) -> Self {
        Self::Http {
            status,
            message: String::new(),
            code: payload
                .get("code")
                .and_then(|c| c.as_str())
                .map(str::to_string),
            payload: Some(payload),
        }
    }

    /// Creates a rejection with a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Returns the HTTP status code if this is an HTTP error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for authentication failures.
    pub fn is_auth(&self) -> bool {
        self.status_code() == Some(401)
    }

    /// Returns `true` if the request was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Extracts a message suitable for display, or `fallback`.
    ///
    /// Lookup order: explicit message, then `payload.message`, then
    /// `payload.data.message`. Empty strings count as missing.
    pub fn message_or(&self, fallback: &str) -> String {
        let found = match self {
            Self::Http {
                message, payload, ..
            } => non_empty(message).or_else(|| payload.as_ref().and_then(payload_message)),
            Self::Rejected(message) => non_empty(message),
            Self::Unexpected(message) => message.as_deref().and_then(non_empty),
            Self::Cancelled => None,
        };
        found.unwrap_or_else(|| fallback.to_string())
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn payload_message(payload: &serde_json::Value) -> Option<String> {
    payload
        .get("message")
        .or_else(|| payload.get("data").and_then(|d| d.get("message")))
        .and_then(|m| m.as_str())
        .and_then(non_empty)
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(Some(err.to_string()))
    }
}
