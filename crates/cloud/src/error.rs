//! Error types for imagery backends.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by imagery backends and their transport.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid catalog response: {0}")]
    InvalidResponse(String),

    #[error("export rejected: {0}")]
    ExportRejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] irrimetrics_core::Error),
}

impl CloudError {
    /// Whether retrying the same request may succeed.
    ///
    /// Timeouts, connection failures, throttling and 5xx responses are
    /// transient; everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CloudError::Status { status, .. } => *status == 429 || *status >= 500,
            CloudError::Network(_) | CloudError::Timeout { .. } | CloudError::Quota(_) => true,
            _ => false,
        }
    }
}

/// Result alias for backend operations.
pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let url = "https://example.com".to_string();
        assert!(CloudError::Status { status: 503, url: url.clone() }.is_transient());
        assert!(CloudError::Status { status: 429, url: url.clone() }.is_transient());
        assert!(!CloudError::Status { status: 404, url }.is_transient());
        assert!(CloudError::Quota("daily".into()).is_transient());
        assert!(!CloudError::NotFound { kind: "region", id: "x".into() }.is_transient());
        assert!(!CloudError::ExportRejected("too big".into()).is_transient());
    }
}
