//! OCR.space `parse/image` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::debug;

use super::{check_status, classify_reqwest, ImageSource, OcrProvider, OcrRequest, ProviderId, RecognizedText};
use crate::{ProviderError, Result};

const DEFAULT_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Provider backed by the OCR.space free/pro API.
pub struct OcrSpaceProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl OcrSpaceProvider {
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

    /// Point the client at a different endpoint (self-hosted, regional).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_form(api_key: &str, request: &OcrRequest<'_>) -> Vec<(&'static str, String)> {
        // OCR.space takes a single three-letter language code.
        let language = match request.language_hints.first().map(String::as_str) {
            Some("en") | Some("eng") => "eng",
            _ => "spa",
        };

        let mut form = vec![
            ("apikey", api_key.to_string()),
            ("language", language.to_string()),
            ("scale", "true".to_string()),
            ("OCREngine", "2".to_string()),
        ];

        match request.source {
            ImageSource::Url(url) => form.push(("url", url.clone())),
            ImageSource::Bytes { data, .. } => form.push((
                "base64Image",
                format!("data:{};base64,{}", request.source.mime_type(), STANDARD.encode(data)),
            )),
        }

        form
    }
}

fn error_message(raw: &Value) -> String {
    match raw.get("ErrorMessage") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        _ => "unknown OCR.space error".to_string(),
    }
}

/// Turn a decoded `parse/image` payload into recognized text.
fn parse_response(raw: Value) -> Result<RecognizedText> {
    if raw.get("IsErroredOnProcessing").and_then(Value::as_bool) == Some(true) {
        let message = error_message(&raw);
        let lower = message.to_lowercase();
        return Err(if lower.contains("api key") || lower.contains("apikey") {
            ProviderError::Auth(message)
        } else if lower.contains("timed out") || lower.contains("server") {
            ProviderError::Server { status: 503, message }
        } else {
            ProviderError::Request { status: 400, message }
        });
    }

    let results = raw
        .get("ParsedResults")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing ParsedResults".to_string()))?;

    let text = results
        .iter()
        .filter_map(|r| r.get("ParsedText").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return Err(ProviderError::NoTextFound);
    }

    Ok(RecognizedText {
        text,
        confidence: None,
        raw,
    })
}

#[async_trait]
impl OcrProvider for OcrSpaceProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OcrSpace
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn recognize(&self, request: OcrRequest<'_>) -> Result<RecognizedText> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("missing OCR.space API key".to_string()))?;

        debug!("OCR.space request for {}", request.source.describe());

        let timeout_ms = self.timeout.as_millis() as u64;
        let response = self
            .client
            .post(&self.endpoint)
            .form(&Self::build_form(api_key, &request))
            .send()
            .await
            .map_err(|e| classify_reqwest(e, timeout_ms))?;

        let raw: Value = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| classify_reqwest(e, timeout_ms))?;

        parse_response(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_results_joined() {
        let raw = json!({
            "ParsedResults": [
                { "ParsedText": "BCP\r\nImporte S/ 62.50" },
                { "ParsedText": "Operación 004512" }
            ],
            "IsErroredOnProcessing": false
        });

        let recognized = parse_response(raw).unwrap();
        assert_eq!(recognized.text, "BCP\r\nImporte S/ 62.50\nOperación 004512");
    }

    #[test]
    fn test_parse_error_array() {
        let raw = json!({
            "IsErroredOnProcessing": true,
            "ErrorMessage": ["The API key is invalid"]
        });
        assert_eq!(
            parse_response(raw),
            Err(ProviderError::Auth("The API key is invalid".into()))
        );
    }

    #[test]
    fn test_parse_blank_text() {
        let raw = json!({ "ParsedResults": [{ "ParsedText": "  " }] });
        assert_eq!(parse_response(raw), Err(ProviderError::NoTextFound));
    }

    #[test]
    fn test_form_sends_base64_for_bytes() {
        let source = ImageSource::Bytes {
            data: b"abc".to_vec(),
            filename: "yape.png".into(),
        };
        let form = OcrSpaceProvider::build_form("k", &OcrRequest {
            source: &source,
            language_hints: &[],
        });

        let image = form.iter().find(|(k, _)| *k == "base64Image").unwrap();
        assert_eq!(image.1, "data:image/png;base64,YWJj");
        assert!(form.contains(&("language", "spa".to_string())));
    }
}
