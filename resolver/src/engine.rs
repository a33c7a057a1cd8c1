use crate::config::Mode;
use crate::gateway::ParameterStore;
use crate::references::{ReferenceCache, ReferenceResolver};
use crate::response_cache::{CacheEntry, ResponseCache};
use crate::types::{RequestKey, ResolvedDocument};
use crate::versions;
use std::sync::Arc;

/// Resolves a request against the parameter store in the configured mode,
/// without any response caching.
pub struct Engine {
    store: Arc<dyn ParameterStore>,
    mode: Mode,
    references: ReferenceResolver,
}

impl Engine {
    /// `debug` turns off the reference cache used in single-key mode.
    pub fn new(store: Arc<dyn ParameterStore>, mode: Mode, debug: bool) -> Self {
        let references = ReferenceResolver::new(store.clone(), !debug);
        Engine {
            store,
            mode,
            references,
        }
    }

    pub async fn resolve(&self, key: &RequestKey) -> ResolvedDocument {
        match self.mode {
            Mode::MultiKey => {
                let parameters =
                    versions::resolve_history(self.store.as_ref(), &key.scope_prefix()).await;
                tracing::debug!(
                    prefix = %key.scope_prefix(),
                    count = parameters.len(),
                    "Loaded parameter history"
                );
                versions::select_version(&parameters, &key.version)
            }
            Mode::SingleKey => {
                self.references
                    .resolve(&key.composite_name(), key.is_latest())
                    .await
            }
        }
    }

    pub fn reference_cache(&self) -> &ReferenceCache {
        self.references.cache()
    }
}

struct ResolverInner {
    engine: Engine,
    cache: ResponseCache,
}

/// Entry point for resolving requests: the engine wrapped by the response cache.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

impl Resolver {
    pub fn new(store: Arc<dyn ParameterStore>, mode: Mode, debug: bool) -> Self {
        Resolver {
            inner: Arc::new(ResolverInner {
                engine: Engine::new(store, mode, debug),
                cache: ResponseCache::new(!debug),
            }),
        }
    }

    /// `key` must already be validated.
    pub async fn resolve(&self, key: &RequestKey) -> CacheEntry {
        tracing::info!(
            identifier = %key.identifier(),
            fingerprint = %key.fingerprint(),
            "Processing request"
        );
        let inner = &self.inner;
        inner
            .cache
            .get_or_resolve(key, inner.engine.resolve(key))
            .await
    }

    pub fn response_cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    pub fn reference_cache(&self) -> &ReferenceCache {
        self.inner.engine.reference_cache()
    }
}
