use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("client not initialized: {0}")]
    NotInitialized(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MailError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }

    pub fn not_initialized(msg: impl Into<String>) -> Self {
        Self::NotInitialized(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for this kind of fault.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::NotInitialized(_) => "NOT_INITIALIZED",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
    pub retryable: bool,
}

impl From<&MailError> for ErrorResponse {
    fn from(err: &MailError) -> Self {
        let (suggestion, retryable) = match err {
            MailError::InvalidInput(_) => (None, false),
            MailError::NotFound(_) => (
                Some("Check the message id, attachment name and local paths"),
                false,
            ),
            MailError::Conflict(_) => (
                Some("Pass overwrite=true or download attachments one at a time"),
                false,
            ),
            MailError::MalformedPayload(_) => (None, false),
            MailError::NotInitialized(_) => (
                Some("Set MAILKIT_ACCESS_TOKEN or MAILKIT_TOKEN_FILE and retry"),
                false,
            ),
            MailError::Auth(_) => (
                Some("Access token rejected. Obtain a fresh token"),
                false,
            ),
            MailError::Transport(_) => (
                Some("Check internet connection and try again"),
                true,
            ),
            MailError::Io(_) => (None, false),
            MailError::Internal(_) => (Some("Unexpected error"), true),
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            suggestion,
            retryable,
        }
    }
}

impl ErrorResponse {
    pub fn to_compact(&self) -> String {
        let mut parts = vec![format!("[{}] {}", self.code, self.message)];
        if let Some(s) = self.suggestion {
            parts.push(format!("Suggestion: {s}"));
        }
        if self.retryable {
            parts.push("(retryable)".to_string());
        }
        parts.join(" | ")
    }
}
