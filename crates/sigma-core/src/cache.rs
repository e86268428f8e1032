//! Result cache in front of the engine gateway
//!
//! Identical (operation, expression, parameters) calls are served from the cache
//! without touching the admission gate or an engine. Backends are swappable through
//! `ResultCache`. Entries are immutable once written; two threads missing on the same key
//! may both compute it, and either value is kept.

use crate::config::{CacheBackend, CacheConfig};
use crate::error::PipelineResult;
use crate::gateway::{EngineCall, EngineGateway};
use dashmap::DashMap;
use sigma_types::{EvaluationParams, EvaluationResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// Full argument tuple of a cached engine operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Evaluate { expression: String },
    Calculate { expression: String, decimals: u32 },
    Draw { expression: String, variable: String, origin: String, bound: String },
}

impl CacheKey {
    pub fn operation(&self) -> &'static str {
        match self {
            CacheKey::Evaluate { .. } => "evaluate",
            CacheKey::Calculate { .. } => "calculate",
            CacheKey::Draw { .. } => "draw",
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            CacheKey::Evaluate { expression }
            | CacheKey::Calculate { expression, .. }
            | CacheKey::Draw { expression, .. } => expression,
        }
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub result: EvaluationResult,
    pub hit: bool,
}

/// Storage behind `EvaluationCache`
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<EvaluationResult>;

    fn insert(&self, key: CacheKey, result: EvaluationResult);

    /// Entries currently held (may lag for backends with deferred maintenance)
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);

    /// Serve `key` from the cache or compute it. Calls aborted by a stop request and
    /// failed computations are not stored.
    fn get_or_try_compute(
        &self,
        key: CacheKey,
        compute: &mut dyn FnMut() -> PipelineResult<EngineCall>,
    ) -> PipelineResult<Lookup> {
        if let Some(result) = self.get(&key) {
            return Ok(Lookup { result, hit: true });
        }
        let call = compute()?;
        if !call.stopped {
            self.insert(key, call.result.clone());
        }
        Ok(Lookup { result: call.result, hit: false })
    }
}

/// Bounded cache with time-to-live eviction
pub struct MokaResultCache {
    inner: moka::sync::Cache<CacheKey, EvaluationResult>,
}

impl MokaResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = moka::sync::Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.time_to_live())
            .build();
        Self { inner }
    }
}

impl ResultCache for MokaResultCache {
    fn get(&self, key: &CacheKey) -> Option<EvaluationResult> {
        self.inner.get(key)
    }

    fn insert(&self, key: CacheKey, result: EvaluationResult) {
        self.inner.insert(key, result);
    }

    fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    fn clear(&self) {
        self.inner.invalidate_all();
    }
}

/// Cache that never evicts
#[derive(Default)]
pub struct UnboundedResultCache {
    inner: DashMap<CacheKey, EvaluationResult>,
}

impl UnboundedResultCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for UnboundedResultCache {
    fn get(&self, key: &CacheKey) -> Option<EvaluationResult> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: CacheKey, result: EvaluationResult) {
        // First write wins; entries never change once stored
        self.inner.entry(key).or_insert(result);
    }

    fn len(&self) -> u64 {
        self.inner.len() as u64
    }

    fn clear(&self) {
        self.inner.clear();
    }
}

/// Stores nothing
#[derive(Debug, Default)]
pub struct NoopResultCache;

impl ResultCache for NoopResultCache {
    fn get(&self, _key: &CacheKey) -> Option<EvaluationResult> {
        None
    }

    fn insert(&self, _key: CacheKey, _result: EvaluationResult) {}

    fn len(&self) -> u64 {
        0
    }

    fn clear(&self) {}
}

/// Build the backend named in the configuration
pub fn backend_for(config: &CacheConfig) -> Box<dyn ResultCache> {
    match config.backend {
        CacheBackend::Moka => Box::new(MokaResultCache::new(config)),
        CacheBackend::Unbounded => Box::new(UnboundedResultCache::new()),
        CacheBackend::Disabled => Box::new(NoopResultCache),
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    /// Calls that reached an engine, cached or not
    pub invocations: u64,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { (self.hits as f64 / total as f64) * 100.0 }
    }
}

/// Caching wrapper around the engine gateway
pub struct EvaluationCache {
    backend: Box<dyn ResultCache>,
    gateway: Arc<EngineGateway>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for EvaluationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationCache")
            .field("gateway", &self.gateway)
            .field("stats", &self.stats())
            .finish()
    }
}

impl EvaluationCache {
    pub fn new(gateway: Arc<EngineGateway>, backend: Box<dyn ResultCache>) -> Self {
        Self { backend, gateway, hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    pub fn gateway(&self) -> &Arc<EngineGateway> {
        &self.gateway
    }

    fn lookup(
        &self,
        key: CacheKey,
        mut compute: impl FnMut() -> PipelineResult<EngineCall>,
    ) -> PipelineResult<EvaluationResult> {
        let operation = key.operation();
        let lookup = self.backend.get_or_try_compute(key, &mut compute)?;
        if lookup.hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(operation, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(operation, "cache miss");
        }
        Ok(lookup.result)
    }

    #[instrument(skip(self))]
    pub fn evaluate(&self, expression: &str) -> PipelineResult<EvaluationResult> {
        let key = CacheKey::Evaluate { expression: expression.to_string() };
        self.lookup(key, || self.gateway.evaluate(expression))
    }

    #[instrument(skip(self))]
    pub fn calculate(&self, expression: &str, decimals: u32) -> PipelineResult<EvaluationResult> {
        let key = CacheKey::Calculate { expression: expression.to_string(), decimals };
        self.lookup(key, || self.gateway.calculate(expression, decimals))
    }

    #[instrument(skip(self))]
    pub fn draw(
        &self,
        expression: &str,
        variable: &str,
        origin: &str,
        bound: &str,
    ) -> PipelineResult<EvaluationResult> {
        let key = CacheKey::Draw {
            expression: expression.to_string(),
            variable: variable.to_string(),
            origin: origin.to_string(),
            bound: bound.to_string(),
        };
        self.lookup(key, || self.gateway.draw(expression, variable, origin, bound))
    }

    /// `draw` over the domain of `params`
    pub fn draw_over(
        &self,
        expression: &str,
        variable: &str,
        params: &EvaluationParams,
    ) -> PipelineResult<EvaluationResult> {
        self.draw(expression, variable, &params.origin, &params.bound)
    }

    /// Display formatting is not cached
    pub fn format_for_display(&self, result: EvaluationResult) -> PipelineResult<EvaluationResult> {
        self.gateway.format_for_display(result)
    }

    pub fn stop_request(&self) {
        self.gateway.stop_request();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.backend.len(),
            invocations: self.gateway.invocations(),
        }
    }

    pub fn clear(&self) {
        self.backend.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AdmissionGate;
    use sigma_engine::{ReferenceEngine, SymbolicEngine};
    use std::time::Duration;

    fn cache(backend: Box<dyn ResultCache>) -> EvaluationCache {
        let gate = Arc::new(AdmissionGate::new(2, Duration::from_millis(5)).unwrap());
        let gateway = Arc::new(EngineGateway::new(
            || Box::new(ReferenceEngine::new()) as Box<dyn SymbolicEngine>,
            gate,
        ));
        EvaluationCache::new(gateway, backend)
    }

    #[test]
    fn repeated_calls_hit_the_cache() {
        for backend in [
            Box::new(MokaResultCache::new(&CacheConfig::default())) as Box<dyn ResultCache>,
            Box::new(UnboundedResultCache::new()) as Box<dyn ResultCache>,
        ] {
            let cache = cache(backend);
            let first = cache.evaluate("2+2").unwrap();
            let second = cache.evaluate("2+2").unwrap();

            assert_eq!(first, second);
            assert_eq!(cache.gateway().invocations(), 1);
            assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1, invocations: 1 });
        }
    }

    #[test]
    fn parameters_are_part_of_the_key() {
        let cache = cache(Box::new(UnboundedResultCache::new()));
        assert_eq!(cache.calculate("1/3", 2).unwrap().expression_text(), "0.33");
        assert_eq!(cache.calculate("1/3", 4).unwrap().expression_text(), "0.3333");
        cache.evaluate("1/3").unwrap();
        assert_eq!(cache.gateway().invocations(), 3);
    }

    #[test]
    fn disabled_backend_always_computes() {
        let cache = cache(Box::new(NoopResultCache));
        cache.evaluate("1").unwrap();
        cache.evaluate("1").unwrap();
        assert_eq!(cache.gateway().invocations(), 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn stopped_calls_are_not_stored() {
        let backend = UnboundedResultCache::new();
        let key = CacheKey::Evaluate { expression: "x".into() };
        let lookup = backend
            .get_or_try_compute(key.clone(), &mut || {
                Ok(EngineCall { result: EvaluationResult::failed("x", "stopped"), stopped: true })
            })
            .unwrap();

        assert!(!lookup.hit);
        assert!(backend.get(&key).is_none());
    }

    #[test]
    fn hit_rate() {
        let stats = CacheStats { hits: 3, misses: 1, entries: 1, invocations: 1 };
        assert_eq!(stats.hit_rate(), 75.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
