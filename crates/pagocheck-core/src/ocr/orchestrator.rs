//! Provider orchestrator: cache check, rate limiting, retry and fallback.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};

use pagocheck_providers::{ImageSource, OcrProvider, OcrRequest, ProviderError, ProviderId, RecognizedText};

use crate::error::{FailureReason, PagoError, ProviderAttempt, Result};
use crate::models::config::PagoConfig;
use crate::models::receipt::OcrResult;
use crate::receipt::ReceiptParser;

use super::cache::{content_hash, ResultCache};
use super::rate_limit::SlidingWindowLimiter;
use super::retry::RetryPolicy;

/// Per-provider overrides for a single `fetch_text` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOptions {
    /// Language hints instead of the orchestrator defaults.
    pub language_hints: Option<Vec<String>>,
    /// Call timeout instead of the orchestrator default.
    pub timeout: Option<Duration>,
    /// Retry budget instead of the orchestrator default.
    pub max_retries: Option<u32>,
}

/// Options for a `fetch_text` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// Overrides keyed by provider.
    pub per_provider: HashMap<ProviderId, ProviderOptions>,
}

impl FetchOptions {
    /// Add overrides for one provider.
    pub fn with_provider(mut self, provider: ProviderId, options: ProviderOptions) -> Self {
        self.per_provider.insert(provider, options);
        self
    }
}

/// Calls OCR providers in order until one succeeds.
pub struct ProviderOrchestrator {
    providers: HashMap<ProviderId, Arc<dyn OcrProvider>>,
    limiters: HashMap<ProviderId, SlidingWindowLimiter>,
    cache: ResultCache,
    parser: ReceiptParser,
    retry: RetryPolicy,
    timeout: Duration,
    language_hints: Vec<String>,
    default_order: Vec<ProviderId>,
}

/// Builder for ProviderOrchestrator.
pub struct ProviderOrchestratorBuilder {
    providers: HashMap<ProviderId, Arc<dyn OcrProvider>>,
    limiters: HashMap<ProviderId, SlidingWindowLimiter>,
    cache: Option<ResultCache>,
    parser: ReceiptParser,
    retry: RetryPolicy,
    timeout: Duration,
    language_hints: Vec<String>,
    default_order: Vec<ProviderId>,
}

impl ProviderOrchestratorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            limiters: HashMap::new(),
            cache: None,
            parser: ReceiptParser::new(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(8),
            language_hints: vec!["es".to_string()],
            default_order: ProviderId::ALL.to_vec(),
        }
    }

    /// Register a provider client.
    pub fn with_provider(mut self, provider: Arc<dyn OcrProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    /// Limit a provider to `max_requests` calls per `window`.
    pub fn with_rate_limit(mut self, provider: ProviderId, max_requests: u32, window: Duration) -> Self {
        self.limiters
            .insert(provider, SlidingWindowLimiter::new(max_requests, window));
        self
    }

    /// Set the result cache.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the receipt parser.
    pub fn with_parser(mut self, parser: ReceiptParser) -> Self {
        self.parser = parser;
        self
    }

    /// Set the default retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the default per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default language hints.
    pub fn with_language_hints(mut self, hints: Vec<String>) -> Self {
        self.language_hints = hints;
        self
    }

    /// Set the order used by `fetch_text_default`.
    pub fn with_default_order(mut self, order: Vec<ProviderId>) -> Self {
        self.default_order = order;
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> ProviderOrchestrator {
        ProviderOrchestrator {
            providers: self.providers,
            limiters: self.limiters,
            cache: self
                .cache
                .unwrap_or_else(|| ResultCache::new(Duration::from_secs(600))),
            parser: self.parser,
            retry: self.retry,
            timeout: self.timeout,
            language_hints: self.language_hints,
            default_order: self.default_order,
        }
    }
}

impl Default for ProviderOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderOrchestrator {
    /// Create a new builder.
    pub fn builder() -> ProviderOrchestratorBuilder {
        ProviderOrchestratorBuilder::new()
    }

    /// Wire an orchestrator from configuration and provider clients.
    pub fn from_config(config: &PagoConfig, providers: Vec<Arc<dyn OcrProvider>>) -> Self {
        let mut builder = Self::builder()
            .with_parser(ReceiptParser::new().with_config(config.extraction.clone()))
            .with_cache(ResultCache::new(Duration::from_secs(config.cache.ttl_secs)))
            .with_retry(RetryPolicy::from(&config.providers.retry))
            .with_timeout(config.providers.timeout())
            .with_language_hints(config.providers.language_hints.clone())
            .with_default_order(config.providers.order.clone());

        for provider in providers {
            let settings = config.providers.settings(provider.id());
            builder = builder
                .with_rate_limit(
                    provider.id(),
                    settings.max_requests,
                    Duration::from_secs(settings.window_secs),
                )
                .with_provider(provider);
        }

        builder.build()
    }

    /// The shared result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The parser applied to provider text.
    pub fn parser(&self) -> &ReceiptParser {
        &self.parser
    }

    /// Fetch text using the configured provider order and no overrides.
    pub async fn fetch_text_default(&self, source: &ImageSource) -> Result<OcrResult> {
        self.fetch_text(source, &self.default_order, &FetchOptions::default())
            .await
    }

    /// Recognize and analyze a receipt, trying providers in `order`.
    ///
    /// A cached result for the same content is returned unchanged. The
    /// first provider that succeeds wins; unconfigured providers are
    /// skipped. Transient failures are retried with backoff, permanent
    /// ones move on to the next provider.
    pub async fn fetch_text(
        &self,
        source: &ImageSource,
        order: &[ProviderId],
        options: &FetchOptions,
    ) -> Result<OcrResult> {
        validate_source(source)?;
        if order.is_empty() {
            return Err(PagoError::Validation("provider order is empty".to_string()));
        }

        let key = content_hash(source);
        if let Some(hit) = self.cache.get(&key) {
            info!("OCR cache hit for {} (provider {})", source.describe(), hit.provider);
            counter!("ocr_cache_hits_total", "provider" => hit.provider.as_str()).increment(1);
            return Ok(hit);
        }

        let mut attempts = Vec::with_capacity(order.len());
        let mut seen = HashSet::new();

        for &id in order {
            if !seen.insert(id) {
                continue;
            }

            let Some(provider) = self.providers.get(&id).filter(|p| p.is_configured()) else {
                debug!("Skipping unconfigured provider {}", id);
                attempts.push(ProviderAttempt {
                    provider: id,
                    calls: 0,
                    reason: FailureReason::NotConfigured,
                    last_error: None,
                });
                continue;
            };

            let overrides = options.per_provider.get(&id).cloned().unwrap_or_default();
            match self.call_with_retry(provider.as_ref(), source, overrides).await {
                Ok(recognized) => {
                    counter!("ocr_provider_success_total", "provider" => id.as_str()).increment(1);
                    let result = self.parser.analyze(id, &recognized);
                    info!(
                        "OCR via {} for {}: total {:?}",
                        id,
                        source.describe(),
                        result.selected_total.as_ref().map(|t| t.value)
                    );
                    self.cache.set(key, result.clone());
                    return Ok(result);
                }
                Err(attempt) => {
                    counter!(
                        "ocr_provider_failure_total",
                        "provider" => id.as_str(),
                        "reason" => attempt.reason.label()
                    )
                    .increment(1);
                    warn!("Provider {} failed after {} calls: {}", id, attempt.calls, attempt.reason);
                    attempts.push(attempt);
                }
            }
        }

        Err(terminal_error(attempts))
    }

    async fn call_with_retry(
        &self,
        provider: &dyn OcrProvider,
        source: &ImageSource,
        overrides: ProviderOptions,
    ) -> std::result::Result<RecognizedText, ProviderAttempt> {
        let id = provider.id();
        let timeout = overrides.timeout.unwrap_or(self.timeout);
        let retry = match overrides.max_retries {
            Some(max_retries) => self.retry.clone().with_max_retries(max_retries),
            None => self.retry.clone(),
        };
        let hints = overrides
            .language_hints
            .unwrap_or_else(|| self.language_hints.clone());

        let mut calls = 0u32;
        let mut last_error = None;
        loop {
            if let Some(limiter) = self.limiters.get(&id) {
                if let Err(limit) = limiter.try_acquire() {
                    return Err(ProviderAttempt {
                        provider: id,
                        calls,
                        reason: FailureReason::RateLimited(limit),
                        last_error,
                    });
                }
            }

            calls += 1;
            let request = OcrRequest {
                source,
                language_hints: &hints,
            };
            let outcome = match tokio::time::timeout(timeout, provider.recognize(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout(timeout.as_millis() as u64)),
            };

            match outcome {
                Ok(recognized) => return Ok(recognized),
                Err(err) if err.is_transient() && calls <= retry.max_retries => {
                    let delay = retry.backoff(calls);
                    debug!("Provider {} call {} failed ({}), retrying in {:?}", id, calls, err, delay);
                    tokio::time::sleep(delay).await;
                    last_error = Some(err);
                }
                Err(err) => {
                    return Err(ProviderAttempt {
                        provider: id,
                        calls,
                        reason: FailureReason::Error(err),
                        last_error: None,
                    });
                }
            }
        }
    }
}

fn validate_source(source: &ImageSource) -> Result<()> {
    match source {
        ImageSource::Url(url) if url.trim().is_empty() => {
            Err(PagoError::Validation("image URL is empty".to_string()))
        }
        ImageSource::Bytes { data, .. } if data.is_empty() => {
            Err(PagoError::Validation("image buffer is empty".to_string()))
        }
        _ => Ok(()),
    }
}

/// Pick the error surfaced when no provider succeeded.
fn terminal_error(attempts: Vec<ProviderAttempt>) -> PagoError {
    let tried: Vec<&ProviderAttempt> = attempts
        .iter()
        .filter(|a| a.reason != FailureReason::NotConfigured)
        .collect();

    // A provider that failed before its window filled up is reported as failed.
    let only_limited = tried
        .iter()
        .all(|a| matches!(a.reason, FailureReason::RateLimited(_)) && a.last_error.is_none());
    if !tried.is_empty() && only_limited {
        if let Some(FailureReason::RateLimited(limit)) = tried.last().map(|a| &a.reason) {
            return PagoError::RateLimited(limit.clone());
        }
    }

    PagoError::AllProvidersFailed { attempts }
}

#[cfg(feature = "http")]
pub use http::create_orchestrator;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use pagocheck_providers::{GoogleVisionProvider, OcrSpaceProvider};

    /// Build an orchestrator with the Google Vision and OCR.space clients.
    pub fn create_orchestrator(config: &PagoConfig) -> Result<ProviderOrchestrator> {
        let timeout = config.providers.timeout();

        let google = GoogleVisionProvider::new(config.providers.google_vision.api_key.clone(), timeout)
            .map_err(|e| PagoError::Config(e.to_string()))?;
        let ocr_space = OcrSpaceProvider::new(config.providers.ocr_space.api_key.clone(), timeout)
            .map_err(|e| PagoError::Config(e.to_string()))?;

        let providers: Vec<Arc<dyn OcrProvider>> = vec![Arc::new(google), Arc::new(ocr_space)];
        Ok(ProviderOrchestrator::from_config(config, providers))
    }
}
