//! Single-key resolution: a document is stored as one compressed blob, and
//! any of its values may point at another blob with an `ssm://<name>` marker.
use crate::codec;
use crate::gateway::ParameterStore;
use crate::metrics_defs::{REFERENCE_CACHE_HIT, REFERENCE_CACHE_MISS};
use crate::types::ResolvedDocument;
use moka::future::Cache;
use shared::counter;
use std::sync::Arc;

pub const REFERENCE_PREFIX: &str = "ssm://";

/// Returns the referenced blob name when `value` starts with the reference marker.
pub fn reference_target(value: &str) -> Option<&str> {
    value.strip_prefix(REFERENCE_PREFIX)
}

/// Decoded blobs by name. Entries are never invalidated, and a blob that
/// failed to load is remembered as an empty document.
pub struct ReferenceCache {
    blobs: Cache<String, Arc<ResolvedDocument>>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        ReferenceCache {
            blobs: Cache::builder().build(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ReferenceResolver {
    store: Arc<dyn ParameterStore>,
    cache: ReferenceCache,
    use_cache: bool,
}

impl ReferenceResolver {
    /// With `use_cache` false every blob is fetched again on each resolution.
    pub fn new(store: Arc<dyn ParameterStore>, use_cache: bool) -> Self {
        ReferenceResolver {
            store,
            cache: ReferenceCache::new(),
            use_cache,
        }
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Resolves the blob `name` and substitutes every reference it holds.
    ///
    /// A reference is replaced by the value stored under the same key in the
    /// referenced blob. If that key is missing the whole document is
    /// discarded and an empty one is returned. References are followed one
    /// level deep only.
    ///
    /// `fresh_root` skips the cache for `name` itself (but not for the blobs
    /// it references).
    pub async fn resolve(&self, name: &str, fresh_root: bool) -> ResolvedDocument {
        let root = if fresh_root {
            Arc::new(self.fetch(name).await)
        } else {
            self.fetch_or_reuse(name).await
        };

        let mut resolved = (*root).clone();
        for (key, value) in root.iter() {
            let Some(target) = reference_target(value) else {
                continue;
            };

            let referenced = self.fetch_or_reuse(target).await;
            match referenced.get(key) {
                Some(substitute) => {
                    tracing::debug!(blob = name, key = %key, target, "Resolved reference");
                    resolved.insert(key.clone(), substitute.clone());
                }
                None => {
                    tracing::warn!(
                        blob = name,
                        key = %key,
                        target,
                        "Referenced blob has no value for key, discarding document"
                    );
                    return ResolvedDocument::new();
                }
            }
        }

        resolved
    }

    async fn fetch_or_reuse(&self, name: &str) -> Arc<ResolvedDocument> {
        if !self.use_cache {
            return Arc::new(self.fetch(name).await);
        }

        let entry = self
            .cache
            .blobs
            .entry(name.to_string())
            .or_insert_with(async { Arc::new(self.fetch(name).await) })
            .await;

        let metric_def = if entry.is_fresh() {
            REFERENCE_CACHE_MISS
        } else {
            REFERENCE_CACHE_HIT
        };
        counter!(metric_def).increment(1);

        entry.into_value()
    }

    /// Loads and decodes a blob. Failures are logged and yield an empty document.
    async fn fetch(&self, name: &str) -> ResolvedDocument {
        let encoded = match self.store.get_value(name).await {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(blob = name, error = %e, "Could not retrieve single key parameter");
                return ResolvedDocument::new();
            }
        };

        match codec::decode(&encoded) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(blob = name, error = %e, "Could not decode single key parameter");
                ResolvedDocument::new()
            }
        }
    }
}
