//! OCR provider abstraction layer for pagocheck.
//!
//! This crate provides a unified interface over the external text
//! recognition services the receipt engine can fall back between:
//! - Google Cloud Vision (`TEXT_DETECTION`)
//! - OCR.space
//!
//! The HTTP clients live behind the `http` feature so the core can be
//! built and tested against in-process fakes.

mod backend;
mod error;

pub use backend::{ImageSource, OcrProvider, OcrRequest, ProviderId, RecognizedText};
pub use error::ProviderError;

#[cfg(feature = "http")]
pub use backend::google_vision::GoogleVisionProvider;

#[cfg(feature = "http")]
pub use backend::ocr_space::OcrSpaceProvider;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
