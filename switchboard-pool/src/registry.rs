//! Priority-ordered provider registry and selection.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::PoolError;
use crate::limiter::RateLimiter;
use crate::provider::{Provider, ProviderConfig, ProviderStats};

/// The ordered, shared set of providers.
///
/// The sequence is kept sorted by priority ascending, Groq first on equal
/// priority. Selection, statistics, and health share the lock; add and
/// remove take it exclusively. Provider counters are never touched while
/// the write lock is held, so the two lock scopes stay independent.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<Provider>>>,
    limiter: RateLimiter,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Registry with the production one-minute rate window.
    pub fn new() -> Self {
        Self::with_limiter(RateLimiter::new())
    }

    /// Registry with a custom rate limiter.
    pub fn with_limiter(limiter: RateLimiter) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            limiter,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Provider>>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Provider>>> {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a provider, replacing any previous one with the same name,
    /// and re-sort the whole sequence.
    pub fn add(&self, config: ProviderConfig) {
        let provider = Arc::new(Provider::new(config));
        let name = provider.name().to_string();
        let kind = provider.kind();
        let priority = provider.priority();
        let quota = provider.requests_per_minute();

        {
            let mut providers = self.write();
            providers.retain(|p| p.name() != name);
            providers.push(provider);
            providers.sort_by(|a, b| {
                a.priority()
                    .cmp(&b.priority())
                    .then_with(|| a.kind().tie_rank().cmp(&b.kind().tie_rank()))
            });
        }

        tracing::info!("registered provider {name} ({kind}, priority {priority})");
        if quota == 0 {
            tracing::warn!("provider {name} has a zero request quota; only the cold fallback can reach it");
        }
    }

    /// Remove a provider by name. Returns `false` when no such provider
    /// was registered.
    pub fn remove(&self, name: &str) -> bool {
        let mut providers = self.write();
        let before = providers.len();
        providers.retain(|p| p.name() != name);
        before != providers.len()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Pick the provider for the next attempt: the best-priority one whose
    /// window still permits a call, else the coldest one (earliest
    /// last-used, never-used first) so the pool stays live under full
    /// rate exhaustion.
    pub fn select(&self) -> Result<Arc<Provider>, PoolError> {
        let providers = self.read();
        if providers.is_empty() {
            return Err(PoolError::NoProviders);
        }
        for provider in providers.iter() {
            if self.limiter.permits(provider) {
                return Ok(Arc::clone(provider));
            }
        }
        // every window is full; ties fall to the better priority
        providers
            .iter()
            .min_by_key(|p| p.last_used())
            .map(Arc::clone)
            .ok_or(PoolError::NoProviders)
    }

    /// Statistics snapshot keyed by provider name.
    pub fn stats(&self) -> HashMap<String, ProviderStats> {
        self.read()
            .iter()
            .map(|p| (p.name().to_string(), p.stats()))
            .collect()
    }

    /// Liveness: some provider permits a call, or at least one provider
    /// is registered. Checking also rolls over any elapsed windows.
    pub fn is_healthy(&self) -> bool {
        let providers = self.read();
        providers.iter().any(|p| self.limiter.permits(p)) || !providers.is_empty()
    }
}
