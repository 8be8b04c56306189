//! Google Cloud Vision `images:annotate` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{check_status, classify_reqwest, ImageSource, OcrProvider, OcrRequest, ProviderId, RecognizedText};
use crate::{ProviderError, Result};

const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Provider backed by Google Cloud Vision text detection.
pub struct GoogleVisionProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl GoogleVisionProvider {
    /// Create a client. `None` credentials leave the provider unconfigured.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout,
        })
    }

    /// Point the client at a different endpoint (proxies, emulators).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_body(request: &OcrRequest<'_>) -> serde_json::Value {
        let image = match request.source {
            ImageSource::Url(url) => json!({ "source": { "imageUri": url } }),
            ImageSource::Bytes { data, .. } => json!({ "content": STANDARD.encode(data) }),
        };

        json!({
            "requests": [{
                "image": image,
                "features": [{ "type": "TEXT_DETECTION" }],
                "imageContext": { "languageHints": request.language_hints },
            }]
        })
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    error: Option<StatusMessage>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct StatusMessage {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Turn a decoded `images:annotate` payload into recognized text.
fn parse_response(raw: serde_json::Value) -> Result<RecognizedText> {
    let parsed: AnnotateResponse = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let first = parsed
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("empty responses array".to_string()))?;

    if let Some(status) = first.error {
        // google.rpc.Code: 7 PERMISSION_DENIED, 16 UNAUTHENTICATED, 14 UNAVAILABLE
        return Err(match status.code {
            7 | 16 => ProviderError::Auth(status.message),
            4 | 13 | 14 => ProviderError::Server { status: 503, message: status.message },
            _ => ProviderError::Request { status: 400, message: status.message },
        });
    }

    let (text, confidence) = match first.full_text_annotation {
        Some(annotation) if !annotation.text.trim().is_empty() => {
            let confidence = annotation.pages.first().and_then(|p| p.confidence);
            (annotation.text, confidence)
        }
        _ => (
            first
                .text_annotations
                .into_iter()
                .next()
                .map(|a| a.description)
                .unwrap_or_default(),
            None,
        ),
    };

    if text.trim().is_empty() {
        return Err(ProviderError::NoTextFound);
    }

    Ok(RecognizedText { text, confidence, raw })
}

#[async_trait]
impl OcrProvider for GoogleVisionProvider {
    fn id(&self) -> ProviderId {
        ProviderId::GoogleVision
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn recognize(&self, request: OcrRequest<'_>) -> Result<RecognizedText> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("missing Google Vision API key".to_string()))?;

        debug!("Google Vision request for {}", request.source.describe());

        let timeout_ms = self.timeout.as_millis() as u64;
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&Self::build_body(&request))
            .send()
            .await
            .map_err(|e| classify_reqwest(e, timeout_ms))?;

        let raw: serde_json::Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| classify_reqwest(e, timeout_ms))?;

        parse_response(raw)
    }
}
