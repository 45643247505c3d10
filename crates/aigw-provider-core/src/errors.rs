use std::error::Error;
use std::fmt;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure modes a `Provider` implementation can surface. The sync pipeline
/// and worker loop (`aigw-core`) map these onto public HTTP statuses and
/// `RequestLog`/`JobAttempt` error fields (`spec.md` §4.C).
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// No HTTP response was received: connect/dns/tls/timeout failures.
    Transport { message: String },
    /// A non-retryable or retries-exhausted HTTP error response.
    Upstream { status: u16, body: String },
    /// Request payload rejected before any network call was attempted.
    InvalidRequest(String),
    Unsupported(&'static str),
    Other(String),
}

impl ProviderError {
    /// Whether the caller should retry this attempt per `spec.md` §4.D:
    /// transport errors and `{408,409,425,429,500,502,503,504}`.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport { .. } => true,
            ProviderError::Upstream { status, .. } => {
                matches!(status, 408 | 409 | 425 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport { message } => write!(f, "transport error: {message}"),
            ProviderError::Upstream { status, body } => {
                write!(f, "upstream error {status}: {body}")
            }
            ProviderError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            ProviderError::Unsupported(what) => write!(f, "unsupported: {what}"),
            ProviderError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for ProviderError {}
