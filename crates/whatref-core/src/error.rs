//! Error types for whatref.

use thiserror::Error;

/// Result type alias using whatref's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for whatref operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No image provided, unsupported format, or otherwise invalid input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Uploaded bytes could not be decoded or re-encoded as an image
    #[error("Normalization error: {0}")]
    Normalization(String),

    /// Missing credential or misconfigured backend
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote call exceeded the client-side deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Remote service returned an error status or a malformed body
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// No connectivity to the remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Guess-again requested after the attempt ceiling was reached
    #[error("{0}")]
    GuessLimitReached(String),

    /// A request is already in flight for this session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Operation not valid in the session's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// History persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classification surfaced to clients as `errorType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Normalization,
    Configuration,
    Timeout,
    Upstream,
    Network,
    GuessLimitReached,
    SessionBusy,
    InvalidState,
    NotFound,
    Storage,
    Internal,
}

impl ErrorKind {
    /// Stable name used as `errorType` in HTTP error bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::Normalization => "NormalizationError",
            Self::Configuration => "ConfigurationError",
            Self::Timeout => "TimeoutError",
            Self::Upstream => "UpstreamError",
            Self::Network => "NetworkError",
            Self::GuessLimitReached => "GuessLimitReached",
            Self::SessionBusy => "SessionBusy",
            Self::InvalidState => "InvalidState",
            Self::NotFound => "NotFound",
            Self::Storage => "StorageError",
            Self::Internal => "InternalError",
        }
    }

    /// Machine-readable code used as `errorCode` in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "INVALID_INPUT",
            Self::Normalization => "IMAGE_DECODE_FAILED",
            Self::Configuration => "CONFIGURATION",
            Self::Timeout => "ETIMEDOUT",
            Self::Upstream => "UPSTREAM_FAILURE",
            Self::Network => "ECONNREFUSED",
            Self::GuessLimitReached => "GUESS_LIMIT_REACHED",
            Self::SessionBusy => "SESSION_BUSY",
            Self::InvalidState => "INVALID_STATE",
            Self::NotFound => "NOT_FOUND",
            Self::Storage => "STORAGE",
            Self::Internal => "INTERNAL",
        }
    }
}

impl Error {
    /// Classify this error for clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Normalization(_) => ErrorKind::Normalization,
            Error::Config(_) => ErrorKind::Configuration,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::Network(_) => ErrorKind::Network,
            Error::GuessLimitReached(_) => ErrorKind::GuessLimitReached,
            Error::SessionBusy(_) => ErrorKind::SessionBusy,
            Error::InvalidState(_) => ErrorKind::InvalidState,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Storage(_) | Error::Io(_) => ErrorKind::Storage,
            Error::Serialization(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this failure came from the inference call itself.
    ///
    /// These never count against a session's guess budget.
    pub fn is_inference_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Timeout | ErrorKind::Upstream | ErrorKind::Network
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_connect() {
            Error::Network(e.to_string())
        } else if e.is_decode() {
            Error::Upstream(format!("Malformed response: {}", e))
        } else if e.is_request() && e.status().is_none() {
            Error::Network(e.to_string())
        } else {
            Error::Upstream(e.to_string())
        }
    }
}
