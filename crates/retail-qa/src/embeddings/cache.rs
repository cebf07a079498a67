//! LRU cache in front of an embedding model.
//!
//! Encodings are deterministic, so caching text → vector is safe. Quality
//! scores built from them are never cached.

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::Result;
use lru::LruCache;
use parking_lot::Mutex;

use super::EmbeddingModel;

pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingModel>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingModel>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EmbeddingModel for CachedEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.lock().get(text) {
            return Ok(cached.clone());
        }

        // Encode outside the lock; concurrent misses on the same text just
        // compute the same vector twice.
        let embedding = self.inner.encode(text)?;
        self.cache.lock().put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}
