//! Core library for payment receipt reconciliation.
//!
//! This crate provides:
//! - Receipt text extraction (normalization, amounts, confidence, total selection)
//! - Account and operation number capture
//! - OCR provider orchestration with caching, rate limiting, retry and fallback
//! - Reconciliation of detected totals against order expectations

pub mod error;
pub mod models;
pub mod ocr;
pub mod receipt;
pub mod reconcile;

pub use error::{FailureReason, PagoError, ProviderAttempt, RateLimitError, Result};
pub use models::config::PagoConfig;
pub use models::order::{OrderExpectation, OrderItem, Outcome, ReconciliationVerdict};
pub use models::receipt::{AmountCandidate, CurrencyHint, OcrResult, ScoredCandidate, SelectedTotal};
pub use ocr::{FetchOptions, ProviderOptions, ProviderOrchestrator, ResultCache};
#[cfg(feature = "http")]
pub use ocr::create_orchestrator;
pub use receipt::ReceiptParser;
pub use reconcile::{reconcile, Reconciler};

/// Re-export provider types.
pub use pagocheck_providers::{ImageSource, OcrProvider, OcrRequest, ProviderError, ProviderId, RecognizedText};
