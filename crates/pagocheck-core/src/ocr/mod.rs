//! OCR provider orchestration: caching, rate limiting, retries and fallback.

mod cache;
mod orchestrator;
mod rate_limit;
mod retry;

pub use cache::{content_hash, ResultCache};
pub use orchestrator::{FetchOptions, ProviderOptions, ProviderOrchestrator, ProviderOrchestratorBuilder};
pub use rate_limit::SlidingWindowLimiter;
pub use retry::RetryPolicy;

#[cfg(feature = "http")]
pub use orchestrator::create_orchestrator;
