//! Process-wide cache for loaded sentiment models.
//!
//! Loading a model means downloading weights and mapping them into memory, so it happens
//! at most once per key for the lifetime of the process. Cached models are cloned out of
//! the cache; clones share their weights.

use crate::core::Result;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Trait implemented by model option types to generate a stable cache key.
pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

type CacheStorage = HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>;

pub struct ModelCache {
    cache: Mutex<CacheStorage>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get a model from the cache, or load it with `loader` if absent.
    ///
    /// The cache lock is held while `loader` runs: concurrent callers asking for the same
    /// model wait for the first load instead of starting their own.
    pub async fn get_or_create<M, Fut, F>(&self, key: &str, loader: F) -> Result<M>
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M>>,
    {
        let cache_key = (TypeId::of::<M>(), key.to_string());
        let mut cache = self.cache.lock().await;

        if let Some(model) = cache
            .get(&cache_key)
            .and_then(|cached| cached.downcast_ref::<M>())
        {
            tracing::debug!(key, "model cache hit");
            return Ok(model.clone());
        }

        tracing::info!(key, "loading model");
        let model = loader().await?;
        cache.insert(cache_key, Arc::new(model.clone()) as Arc<dyn Any + Send + Sync>);
        Ok(model)
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.lock().await.is_empty()
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

/// Get a reference to the global model cache.
pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}
