//! Error types for the provider layer.

use thiserror::Error;

/// Errors reported by an OCR provider call.
///
/// Every variant is classified as either transient (worth retrying with
/// backoff) or permanent (advance to the next provider immediately).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider has no credentials or endpoint configured.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The provider rejected our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider processed the image but found no text in it.
    #[error("no text found in image")]
    NoTextFound,

    /// The call did not complete within the configured timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The provider answered with a 5xx status or throttled us (429).
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The provider rejected the request itself (4xx other than auth/429).
    #[error("request rejected (HTTP {status}): {message}")]
    Request { status: u16, message: String },

    /// The provider answered with a body we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether the failure may succeed if the same call is retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout(_) | ProviderError::Connection(_) | ProviderError::Server { .. }
        )
    }

    /// Map an HTTP status and body excerpt onto the error taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ProviderError::Auth(message),
            429 | 500..=599 => ProviderError::Server { status, message },
            _ => ProviderError::Request { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Timeout(5000).is_transient());
        assert!(ProviderError::Connection("refused".into()).is_transient());
        assert!(ProviderError::from_status(503, "unavailable").is_transient());
        assert!(ProviderError::from_status(429, "slow down").is_transient());

        assert!(!ProviderError::NoTextFound.is_transient());
        assert!(!ProviderError::NotConfigured("missing key".into()).is_transient());
        assert!(!ProviderError::from_status(401, "bad key").is_transient());
        assert!(!ProviderError::from_status(400, "bad image").is_transient());
    }

    #[test]
    fn test_from_status_auth() {
        assert_eq!(
            ProviderError::from_status(403, "forbidden"),
            ProviderError::Auth("forbidden".into())
        );
    }
}
