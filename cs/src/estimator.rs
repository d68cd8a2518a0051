//! Token estimation for JSON payloads
//!
//! Payloads are measured in language-model tokens, not bytes. The default
//! backend is a BPE encoding from `tiktoken-rs`, selected from a model
//! identifier. Unknown models fall back to `cl100k_base` instead of failing.
//!
//! Encodings are expensive to build, so each estimator owns a small cache
//! (at most [`MAX_CACHED_ENCODINGS`] entries) that is filled lazily and never
//! cleared.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};
use tracing::{debug, warn};

use crate::error::EstimateError;

/// Maximum number of distinct encodings kept in the cache
pub const MAX_CACHED_ENCODINGS: usize = 4;

/// Encoding used when a model identifier is not recognized
pub const FALLBACK_TOKENIZER: Tokenizer = Tokenizer::Cl100kBase;

/// Counts tokens in a piece of text
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE-backed counter
pub struct BpeCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter for BpeCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }
}

/// Character-based counter: ceil(chars / chars_per_token)
///
/// Cheap and monotone. Used for tests and for offline sizing where loading
/// a BPE table is not worth it.
#[derive(Debug, Clone)]
pub struct HeuristicCounter {
    chars_per_token: usize,
}

impl HeuristicCounter {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for HeuristicCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Lazily-built encodings, keyed by encoding name
struct EncodingCache {
    entries: Mutex<HashMap<String, Arc<CoreBPE>>>,
}

impl EncodingCache {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get or build the encoding for a tokenizer
    ///
    /// The lock is held across construction so concurrent first use builds
    /// the encoding once. When the cache is full the encoding is built and
    /// returned without being cached.
    fn get(&self, tokenizer: Tokenizer) -> Result<Arc<CoreBPE>, EstimateError> {
        let key = format!("{:?}", tokenizer);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(bpe) = entries.get(&key) {
            return Ok(Arc::clone(bpe));
        }

        debug!(%key, cached = entries.len(), "EncodingCache::get: building encoding");
        let bpe = tiktoken_rs::get_bpe_from_tokenizer(tokenizer)
            .map(Arc::new)
            .map_err(|e| EstimateError::EncodingUnavailable {
                encoding: key.clone(),
                message: e.to_string(),
            })?;

        if entries.len() < MAX_CACHED_ENCODINGS {
            entries.insert(key, Arc::clone(&bpe));
        } else {
            debug!(%key, "EncodingCache::get: cache full, not caching");
        }
        Ok(bpe)
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

enum Backend {
    Bpe {
        cache: EncodingCache,
        default: Arc<dyn TokenCounter>,
    },
    Fixed(Arc<dyn TokenCounter>),
}

/// Estimates the token cost of serialized payloads
pub struct TokenEstimator {
    model: String,
    backend: Backend,
}

impl std::fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Bpe { .. } => "bpe",
            Backend::Fixed(_) => "fixed",
        };
        f.debug_struct("TokenEstimator")
            .field("model", &self.model)
            .field("backend", &backend)
            .finish()
    }
}

/// Map a model identifier to its encoding, falling back for unknown names
pub fn tokenizer_for_model(model: &str) -> Tokenizer {
    match get_tokenizer(model) {
        Some(tokenizer) => tokenizer,
        None => {
            debug!(%model, "tokenizer_for_model: unknown model, using fallback encoding");
            FALLBACK_TOKENIZER
        }
    }
}

impl TokenEstimator {
    /// Create a BPE estimator for a model
    ///
    /// Fails only if the encoding itself cannot be constructed.
    pub fn new(model: impl Into<String>) -> Result<Self, EstimateError> {
        let model = model.into();
        debug!(%model, "TokenEstimator::new: called");
        let cache = EncodingCache::new();
        let bpe = cache.get(tokenizer_for_model(&model))?;
        let default: Arc<dyn TokenCounter> = Arc::new(BpeCounter { bpe });

        Ok(Self {
            model,
            backend: Backend::Bpe { cache, default },
        })
    }

    /// Create an estimator backed by a custom counter
    ///
    /// Model identifiers are ignored by this backend.
    pub fn with_counter(counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            model: "custom".to_string(),
            backend: Backend::Fixed(counter),
        }
    }

    /// Create an estimator using [`HeuristicCounter`]
    pub fn heuristic() -> Self {
        Self::with_counter(Arc::new(HeuristicCounter::default()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of encodings currently held in the cache
    pub fn cached_encodings(&self) -> usize {
        match &self.backend {
            Backend::Bpe { cache, .. } => cache.len(),
            Backend::Fixed(_) => 0,
        }
    }

    fn default_counter(&self) -> &Arc<dyn TokenCounter> {
        match &self.backend {
            Backend::Bpe { default, .. } => default,
            Backend::Fixed(counter) => counter,
        }
    }

    fn counter_for(&self, model: &str) -> Arc<dyn TokenCounter> {
        match &self.backend {
            Backend::Fixed(counter) => Arc::clone(counter),
            Backend::Bpe { cache, default } => match cache.get(tokenizer_for_model(model)) {
                Ok(bpe) => Arc::new(BpeCounter { bpe }),
                Err(e) => {
                    warn!(%model, error = %e, "Encoding unavailable, using default encoding");
                    Arc::clone(default)
                }
            },
        }
    }

    /// Estimate the token cost of a value
    ///
    /// `formatted` measures the pretty-printed form; it never reports less
    /// than the compact form.
    pub fn estimate(&self, value: &Value, formatted: bool) -> usize {
        measure(self.default_counter().as_ref(), value, formatted)
    }

    /// Estimate using another model's encoding
    pub fn estimate_with_model(&self, model: &str, value: &Value, formatted: bool) -> usize {
        let counter = self.counter_for(model);
        measure(counter.as_ref(), value, formatted)
    }
}

fn measure(counter: &dyn TokenCounter, value: &Value, formatted: bool) -> usize {
    let compact = counter.count(&value.to_string());
    if formatted {
        let pretty = counter.count(&format!("{:#}", value));
        pretty.max(compact)
    } else {
        compact
    }
}
