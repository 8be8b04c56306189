//! Configuration structures for the reconciliation pipeline.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pagocheck_providers::ProviderId;

use crate::error::{PagoError, Result};

/// Main configuration for the pagocheck pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PagoConfig {
    /// Text normalization and amount extraction.
    pub extraction: ExtractionConfig,

    /// OCR providers, fallback order and call policy.
    pub providers: ProvidersConfig,

    /// OCR result cache.
    pub cache: CacheConfig,

    /// Order matching.
    pub reconciliation: ReconciliationConfig,
}

/// Receipt text extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum characters kept from provider text; longer text is truncated.
    pub max_text_length: usize,

    /// Confidence scoring tunables.
    pub scoring: ScoringWeights,

    /// Total selection tunables.
    pub selection: SelectionWeights,

    /// Account/operation number classification.
    pub numbers: NumberRules,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_text_length: 10_000,
            scoring: ScoringWeights::default(),
            selection: SelectionWeights::default(),
            numbers: NumberRules::default(),
        }
    }
}

/// Weights used by the confidence scorer.
///
/// These are heuristics tuned on Peruvian wallet and bank vouchers; treat
/// them as tunables for other receipt formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Starting score for every candidate.
    pub base: f64,
    /// Values strictly above this count as likely grand totals.
    pub large_value_threshold: f64,
    /// Bonus for values above `large_value_threshold`.
    pub large_value_bonus: f64,
    /// Bonus when the candidate carried a currency marker.
    pub currency_bonus: f64,
    /// Bonus when a total keyword is near the candidate.
    pub keyword_bonus: f64,
    /// Penalty when the nearest preceding label is a subtotal.
    pub subtotal_penalty: f64,
    /// Characters inspected on each side of the candidate.
    pub window_radius: usize,
    /// Lowercase keywords that indicate a paid total.
    pub total_keywords: Vec<String>,
    /// Lowercase keywords that indicate a partial sum.
    pub subtotal_keywords: Vec<String>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 0.5,
            large_value_threshold: 50.0,
            large_value_bonus: 0.2,
            currency_bonus: 0.15,
            keyword_bonus: 0.25,
            subtotal_penalty: 0.15,
            window_radius: 40,
            total_keywords: ["total", "importe", "monto", "pagado", "saldo"]
                .into_iter()
                .map(String::from)
                .collect(),
            subtotal_keywords: vec!["subtotal".to_string()],
        }
    }
}

/// Weights used by the total selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
    /// Keyword tier ranks by `confidence + value / value_divisor`.
    pub value_divisor: f64,
    /// Fallback tier ranks by `value * (confidence + confidence_offset)`.
    pub confidence_offset: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            value_divisor: 1000.0,
            confidence_offset: 0.5,
        }
    }
}

/// Digit-run classification for account and operation numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NumberRules {
    /// Shortest digit run considered at all.
    pub min_digits: usize,
    /// Longest digit run considered at all.
    pub max_digits: usize,
    /// Shortest run classified as an account (phone-linked wallets).
    pub account_min_digits: usize,
    /// Longest run classified as an account.
    pub account_max_digits: usize,
}

impl Default for NumberRules {
    fn default() -> Self {
        Self {
            min_digits: 6,
            max_digits: 20,
            account_min_digits: 9,
            account_max_digits: 11,
        }
    }
}

impl NumberRules {
    /// Digit-run lengths that are captured.
    pub fn run_range(&self) -> RangeInclusive<usize> {
        self.min_digits..=self.max_digits
    }

    /// Digit-run lengths classified as accounts.
    pub fn account_range(&self) -> RangeInclusive<usize> {
        self.account_min_digits..=self.account_max_digits
    }
}

/// OCR provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Fallback order; the first provider that succeeds wins.
    pub order: Vec<ProviderId>,

    /// Google Cloud Vision settings.
    pub google_vision: ProviderSettings,

    /// OCR.space settings.
    pub ocr_space: ProviderSettings,

    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,

    /// Retry policy for transient failures.
    pub retry: RetryConfig,

    /// Language hints passed to every provider.
    pub language_hints: Vec<String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: ProviderId::ALL.to_vec(),
            google_vision: ProviderSettings::default(),
            ocr_space: ProviderSettings::default(),
            timeout_ms: 8_000,
            retry: RetryConfig::default(),
            language_hints: vec!["es".to_string()],
        }
    }
}

impl ProvidersConfig {
    /// Settings for one provider.
    pub fn settings(&self, provider: ProviderId) -> &ProviderSettings {
        match provider {
            ProviderId::GoogleVision => &self.google_vision,
            ProviderId::OcrSpace => &self.ocr_space,
        }
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Credentials and limits for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key; `None` leaves the provider unconfigured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum calls in the sliding window.
    pub max_requests: u32,

    /// Sliding window length in seconds.
    pub window_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            max_requests: 30,
            window_secs: 60,
        }
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first call (so `max_retries + 1` calls at most).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay.
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 300,
            max_backoff_ms: 3_000,
            multiplier: 2.0,
        }
    }
}

/// OCR result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live for cached OCR results, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

/// Reconciliation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Relative tolerance for a `close` outcome (0.06 = 6%).
    pub tolerance: f64,

    /// Reject anything that is not an exact match.
    pub require_exact_match: bool,

    /// Minimum selected-total confidence for `detected_only`.
    pub detected_confidence_threshold: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.06,
            require_exact_match: false,
            detected_confidence_threshold: 0.7,
        }
    }
}

impl PagoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject out-of-range values before they reach the engine.
    pub fn validate(&self) -> Result<()> {
        let tolerance = self.reconciliation.tolerance;
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(PagoError::Config(format!(
                "reconciliation.tolerance must be within [0, 1], got {tolerance}"
            )));
        }

        let numbers = &self.extraction.numbers;
        if numbers.min_digits > numbers.max_digits
            || numbers.account_min_digits > numbers.account_max_digits
        {
            return Err(PagoError::Config(
                "extraction.numbers ranges must have min <= max".to_string(),
            ));
        }

        if self.extraction.selection.value_divisor <= 0.0 {
            return Err(PagoError::Config(
                "extraction.selection.value_divisor must be positive".to_string(),
            ));
        }

        if self.providers.order.is_empty() {
            return Err(PagoError::Config("providers.order must not be empty".to_string()));
        }

        Ok(())
    }
}
