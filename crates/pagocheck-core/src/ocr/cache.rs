//! Content-addressed, time-boxed cache of OCR results.

use std::time::Duration;

use moka::sync::Cache;
use sha2::{Digest, Sha256};
use tracing::trace;

use pagocheck_providers::ImageSource;

use crate::models::receipt::OcrResult;

/// SHA-256 hex digest identifying an image source.
///
/// URLs hash their string form; byte buffers hash their content, so the
/// same photo re-uploaded under another file name still hits.
pub fn content_hash(source: &ImageSource) -> String {
    let mut hasher = Sha256::new();
    match source {
        ImageSource::Url(url) => {
            hasher.update(b"url:");
            hasher.update(url.as_bytes());
        }
        ImageSource::Bytes { data, .. } => {
            hasher.update(b"bytes:");
            hasher.update(data);
        }
    }
    hex::encode(hasher.finalize())
}

/// TTL key-value store in front of the provider orchestrator.
///
/// There is no size bound; growth is limited by the TTL window.
#[derive(Clone)]
pub struct ResultCache {
    ttl: Duration,
    entries: Cache<String, OcrResult>,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a result; entries older than the TTL are missed.
    pub fn get(&self, key: &str) -> Option<OcrResult> {
        let hit = self.entries.get(key);
        if hit.is_none() {
            trace!("Cache miss for {}", key);
        }
        hit
    }

    /// Store a result, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: OcrResult) {
        self.entries.insert(key.into(), value);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }
}
