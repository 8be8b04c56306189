//! Error types for the pagocheck-core library.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use pagocheck_providers::{ProviderError, ProviderId};

/// Main error type for the pagocheck library.
#[derive(Error, Debug)]
pub enum PagoError {
    /// Malformed input to a public entry point. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Every configured provider in the fallback order failed.
    #[error("all OCR providers failed: {}", ProviderAttempt::summarize(.attempts))]
    AllProvidersFailed { attempts: Vec<ProviderAttempt> },

    /// A sliding-window request limit was exceeded.
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PagoError {
    /// Message suitable for relaying to the customer on WhatsApp.
    ///
    /// Provider failures degrade to asking for a clearer photo instead of
    /// surfacing technical details.
    pub fn customer_message(&self) -> &'static str {
        match self {
            PagoError::AllProvidersFailed { .. } => {
                "No pudimos leer tu comprobante. ¿Podrías enviarnos una foto más clara?"
            }
            PagoError::RateLimited(_) => {
                "Estamos recibiendo muchos comprobantes. Por favor, reenvíalo en unos minutos."
            }
            PagoError::Validation(_) => {
                "No recibimos una imagen válida. ¿Podrías enviar la foto del comprobante nuevamente?"
            }
            PagoError::Config(_) | PagoError::Io(_) | PagoError::Json(_) => {
                "Tuvimos un problema revisando tu pago. Un asesor lo verificará en breve."
            }
        }
    }
}

/// Why a provider did not produce a result during a fallback run.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// No client registered or credentials missing.
    NotConfigured,
    /// The provider's sliding window was full.
    RateLimited(RateLimitError),
    /// The provider returned an error (after retries, when transient).
    Error(ProviderError),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NotConfigured => f.write_str("not configured"),
            FailureReason::RateLimited(e) => write!(f, "{e}"),
            FailureReason::Error(e) => write!(f, "{e}"),
        }
    }
}

/// One provider's outcome inside an `AllProvidersFailed` error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAttempt {
    /// Provider that was tried (or skipped).
    pub provider: ProviderId,
    /// Number of network calls made to it.
    pub calls: u32,
    /// Final failure reason.
    pub reason: FailureReason,
    /// Provider error behind the last retry, when the attempt ended for
    /// another reason (a full rate-limit window).
    pub last_error: Option<ProviderError>,
}

impl FailureReason {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::NotConfigured => "not_configured",
            FailureReason::RateLimited(_) => "rate_limited",
            FailureReason::Error(e) if e.is_transient() => "transient",
            FailureReason::Error(_) => "permanent",
        }
    }
}

impl ProviderAttempt {
    fn summarize(attempts: &[ProviderAttempt]) -> String {
        if attempts.is_empty() {
            return "no providers in order".to_string();
        }
        attempts
            .iter()
            .map(|a| match &a.last_error {
                Some(err) => format!("{} ({} calls): {} after {}", a.provider, a.calls, a.reason, err),
                None => format!("{} ({} calls): {}", a.provider, a.calls, a.reason),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Raised when a sliding-window limiter rejects a request.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("rate limit exceeded: {limit} requests per {window:?}, retry after {retry_after:?}")]
pub struct RateLimitError {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Window length.
    pub window: Duration,
    /// Time until the oldest request leaves the window.
    pub retry_after: Duration,
}

/// Result type for the pagocheck library.
pub type Result<T> = std::result::Result<T, PagoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_message_lists_attempts() {
        let err = PagoError::AllProvidersFailed {
            attempts: vec![
                ProviderAttempt {
                    provider: ProviderId::GoogleVision,
                    calls: 3,
                    reason: FailureReason::Error(ProviderError::Timeout(8000)),
                    last_error: None,
                },
                ProviderAttempt {
                    provider: ProviderId::OcrSpace,
                    calls: 0,
                    reason: FailureReason::NotConfigured,
                    last_error: None,
                },
            ],
        };

        let message = err.to_string();
        assert!(message.contains("google_vision (3 calls): request timed out after 8000 ms"));
        assert!(message.contains("ocr_space (0 calls): not configured"));
    }

    #[test]
    fn test_rate_limited_attempt_keeps_last_error() {
        let err = PagoError::AllProvidersFailed {
            attempts: vec![ProviderAttempt {
                provider: ProviderId::OcrSpace,
                calls: 1,
                reason: FailureReason::RateLimited(RateLimitError {
                    limit: 1,
                    window: Duration::from_secs(60),
                    retry_after: Duration::from_secs(59),
                }),
                last_error: Some(ProviderError::Timeout(8000)),
            }],
        };

        let message = err.to_string();
        assert!(message.contains("ocr_space (1 calls): rate limit exceeded"));
        assert!(message.contains("after request timed out after 8000 ms"));
    }

    #[test]
    fn test_customer_message_asks_for_clearer_photo() {
        let err = PagoError::AllProvidersFailed { attempts: Vec::new() };
        assert!(err.customer_message().contains("foto más clara"));
    }
}
