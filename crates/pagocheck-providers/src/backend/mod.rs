//! OCR provider implementations.

#[cfg(feature = "http")]
pub mod google_vision;

#[cfg(feature = "http")]
pub mod ocr_space;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ProviderError, Result};

/// Identifier of a supported OCR provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Google Cloud Vision `TEXT_DETECTION`.
    GoogleVision,
    /// OCR.space parse API.
    OcrSpace,
}

impl ProviderId {
    /// All providers in the default fallback order.
    pub const ALL: [ProviderId; 2] = [ProviderId::GoogleVision, ProviderId::OcrSpace];

    /// Stable name used in config files, logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::GoogleVision => "google_vision",
            ProviderId::OcrSpace => "ocr_space",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "google_vision" | "google" | "vision" => Ok(ProviderId::GoogleVision),
            "ocr_space" | "ocrspace" => Ok(ProviderId::OcrSpace),
            other => Err(format!("unknown OCR provider: {other}")),
        }
    }
}

/// Where the receipt image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Publicly reachable image URL (e.g. a WhatsApp media link).
    Url(String),
    /// Raw image bytes with the original file name.
    Bytes { data: Vec<u8>, filename: String },
}

impl ImageSource {
    /// Short description for logs; never includes the image bytes.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Url(url) => format!("url {url}"),
            ImageSource::Bytes { data, filename } => format!("{filename} ({} bytes)", data.len()),
        }
    }

    /// Guess a MIME type from the file name, defaulting to JPEG.
    pub fn mime_type(&self) -> &'static str {
        let name = match self {
            ImageSource::Url(url) => url.as_str(),
            ImageSource::Bytes { filename, .. } => filename.as_str(),
        };
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".png") {
            "image/png"
        } else if lower.ends_with(".webp") {
            "image/webp"
        } else if lower.ends_with(".gif") {
            "image/gif"
        } else if lower.ends_with(".pdf") {
            "application/pdf"
        } else {
            "image/jpeg"
        }
    }
}

/// A single recognition request handed to a provider.
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    /// Image to recognize.
    pub source: &'a ImageSource,
    /// BCP-47 language hints, e.g. `["es"]`.
    pub language_hints: &'a [String],
}

/// Text returned by a provider before any receipt analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    /// Full recognized text.
    pub text: String,
    /// Provider-reported confidence, when the provider exposes one.
    pub confidence: Option<f64>,
    /// Untouched provider payload, kept for diagnostics.
    pub raw: serde_json::Value,
}

/// Trait for OCR providers.
///
/// Implementations perform exactly one network call per `recognize`
/// invocation; retries, timeouts and fallback are the caller's business.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Which provider this is.
    fn id(&self) -> ProviderId;

    /// Whether credentials are present. Unconfigured providers are skipped.
    fn is_configured(&self) -> bool;

    /// Recognize the text in the requested image.
    async fn recognize(&self, request: OcrRequest<'_>) -> Result<RecognizedText>;
}

#[cfg(feature = "http")]
pub(crate) fn classify_reqwest(err: reqwest::Error, timeout_ms: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_ms)
    } else if err.is_connect() || err.is_request() {
        ProviderError::Connection(err.to_string())
    } else if let Some(status) = err.status() {
        ProviderError::from_status(status.as_u16(), err.to_string())
    } else if err.is_decode() {
        ProviderError::InvalidResponse(err.to_string())
    } else {
        ProviderError::Connection(err.to_string())
    }
}

#[cfg(feature = "http")]
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(200).collect();
    Err(ProviderError::from_status(status.as_u16(), excerpt))
}
