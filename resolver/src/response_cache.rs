// Process-wide cache of resolved documents keyed by request fingerprint.
//
// Entries never expire and are never invalidated: a cached version is treated
// as immutable, so parameters added under an already cached version are only
// picked up after a restart. `latest` is never cached and debug mode turns the
// cache off completely. Concurrent misses for one fingerprint are coalesced
// so only one of them resolves against the store.
use crate::metrics_defs::{RESPONSE_CACHE_BYPASS, RESPONSE_CACHE_HIT, RESPONSE_CACHE_MISS};
use crate::types::{Fingerprint, RequestKey, ResolvedDocument};
use http::StatusCode;
use moka::future::Cache;
use shared::counter;
use std::future::Future;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub document: Arc<ResolvedDocument>,
    pub status: StatusCode,
}

impl CacheEntry {
    pub fn ok(fingerprint: Fingerprint, document: ResolvedDocument) -> Self {
        CacheEntry {
            fingerprint,
            document: Arc::new(document),
            status: StatusCode::OK,
        }
    }
}

// Returned from the resolution when the result must not be stored. Waiters
// coalesced onto that resolution get this as well.
#[derive(Debug)]
struct EmptyDocument;

pub struct ResponseCache {
    entries: Cache<Fingerprint, CacheEntry>,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(enabled: bool) -> Self {
        ResponseCache {
            entries: Cache::builder().build(),
            enabled,
        }
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        self.entries.get(fingerprint).await
    }

    /// Stores `entry` unless caching is disabled, the document is empty or
    /// the key asks for `latest`.
    pub async fn put(&self, key: &RequestKey, entry: CacheEntry) {
        if self.enabled && is_cacheable(key, &entry.document) {
            self.entries.insert(entry.fingerprint.clone(), entry).await;
        }
    }

    /// Returns the cached response for `key`, or runs `resolve` and caches
    /// its result under the write policy of [`ResponseCache::put`].
    pub async fn get_or_resolve<F>(&self, key: &RequestKey, resolve: F) -> CacheEntry
    where
        F: Future<Output = ResolvedDocument>,
    {
        let fingerprint = key.fingerprint();

        if !self.enabled {
            counter!(RESPONSE_CACHE_BYPASS).increment(1);
            tracing::debug!("Bypassing response cache due to debug mode");
            return CacheEntry::ok(fingerprint, resolve.await);
        }

        if key.is_latest() {
            counter!(RESPONSE_CACHE_BYPASS).increment(1);
            tracing::debug!(identifier = %key.identifier(), "Not caching latest version");
            return CacheEntry::ok(fingerprint, resolve.await);
        }

        let init_fingerprint = fingerprint.clone();
        let result = self
            .entries
            .entry(fingerprint.clone())
            .or_try_insert_with(async move {
                let document = resolve.await;
                if document.is_empty() {
                    Err(EmptyDocument)
                } else {
                    Ok(CacheEntry::ok(init_fingerprint, document))
                }
            })
            .await;

        match result {
            Ok(entry) if entry.is_fresh() => {
                counter!(RESPONSE_CACHE_MISS).increment(1);
                tracing::info!(fingerprint = %fingerprint, "Caching result set");
                entry.into_value()
            }
            Ok(entry) => {
                counter!(RESPONSE_CACHE_HIT).increment(1);
                tracing::info!(fingerprint = %fingerprint, "Retrieved parameters from cache");
                entry.into_value()
            }
            Err(_) => {
                counter!(RESPONSE_CACHE_MISS).increment(1);
                tracing::info!(fingerprint = %fingerprint, "Resolved empty document, not caching");
                CacheEntry::ok(fingerprint, ResolvedDocument::new())
            }
        }
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }
}

fn is_cacheable(key: &RequestKey, document: &ResolvedDocument) -> bool {
    !document.is_empty() && !key.is_latest()
}
