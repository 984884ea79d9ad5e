//! The dispatcher: selection, translation, transport, parsing, failover.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PoolError;
use crate::protocol::{self, WireFormat};
use crate::provider::{Provider, ProviderConfig, ProviderStats};
use crate::registry::ProviderRegistry;
use crate::types::{ChatRequest, ChatResponse};

/// Default end-to-end timeout for one upstream call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A pool of providers behind one canonical chat call.
///
/// Safe to share across tasks: `chat` takes `&self`, registry and
/// per-provider locks are scoped tightly, and nothing is held across the
/// network await.
#[derive(Debug)]
pub struct ProviderPool {
    registry: ProviderRegistry,
    client: reqwest::Client,
}

impl ProviderPool {
    /// Pool with the default 30-second per-call timeout.
    pub fn new() -> Result<Self, PoolError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Pool with a custom per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, PoolError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            registry: ProviderRegistry::new(),
            client,
        })
    }

    /// Register a provider; an existing provider with the same name is
    /// replaced.
    pub fn add_provider(&self, config: ProviderConfig) {
        self.registry.add(config);
    }

    /// Remove a provider by name; `false` when it was not registered.
    pub fn remove_provider(&self, name: &str) -> bool {
        self.registry.remove(name)
    }

    /// Statistics snapshot keyed by provider name.
    pub fn stats(&self) -> HashMap<String, ProviderStats> {
        self.registry.stats()
    }

    /// Liveness signal.
    pub fn is_healthy(&self) -> bool {
        self.registry.is_healthy()
    }

    /// Route one canonical request through the pool.
    ///
    /// Attempts run strictly one after another and are bounded by the
    /// number of providers registered when the call starts, so concurrent
    /// removals cannot extend the loop. Every attempt updates the chosen
    /// provider's statistics exactly once, cancellation included; a
    /// provider may be attempted more than once when re-selection keeps
    /// returning it.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, PoolError> {
        let max_attempts = self.registry.len();
        let mut last_error: Option<PoolError> = None;

        for attempt in 0..max_attempts {
            let provider = match self.registry.select() {
                Ok(provider) => provider,
                Err(err) => return Err(exhausted(attempt, last_error.unwrap_or(err))),
            };
            tracing::debug!(
                "attempt {}/{}: dispatching to {}",
                attempt + 1,
                max_attempts,
                provider.name()
            );

            match self.try_provider(&provider, request).await {
                Ok(mut response) => {
                    response.provider = provider.name().to_string();
                    return Ok(response);
                }
                Err(err) => {
                    tracing::warn!("provider {} failed: {}", provider.name(), err);
                    if !err.is_retryable() {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(exhausted(
            max_attempts,
            last_error.unwrap_or(PoolError::NoProviders),
        ))
    }

    /// One attempt against one provider, with its statistics update tied
    /// to every exit path.
    async fn try_provider(
        &self,
        provider: &Arc<Provider>,
        request: &ChatRequest,
    ) -> Result<ChatResponse, PoolError> {
        let guard = AttemptGuard::new(provider);
        let format = protocol::for_kind(provider.kind());
        let result = self.call(format, provider, request).await;
        guard.finish(result.is_ok());
        result
    }

    async fn call(
        &self,
        format: &dyn WireFormat,
        provider: &Provider,
        request: &ChatRequest,
    ) -> Result<ChatResponse, PoolError> {
        let model = request.model.as_deref().unwrap_or(provider.model());
        let body = format.build(model, request)?;
        let headers = format.headers(provider.api_key())?;
        let url = format.endpoint(provider.base_url());

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        if status != 200 {
            return Err(PoolError::Upstream {
                provider: provider.name().to_string(),
                status,
                message: excerpt(&bytes),
            });
        }

        format.parse(&bytes)
    }
}

/// Records a failed attempt when dropped, unless `finish` ran first. This
/// keeps the per-attempt statistics update exact even when the caller
/// cancels the dispatch mid-transport by dropping the future.
struct AttemptGuard {
    provider: Option<Arc<Provider>>,
}

impl AttemptGuard {
    fn new(provider: &Arc<Provider>) -> Self {
        Self {
            provider: Some(Arc::clone(provider)),
        }
    }

    fn finish(mut self, success: bool) {
        if let Some(provider) = self.provider.take() {
            provider.record_attempt(success);
        }
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            provider.record_attempt(false);
        }
    }
}

fn exhausted(attempts: usize, last: PoolError) -> PoolError {
    PoolError::Exhausted {
        attempts,
        last: Box::new(last),
    }
}

/// Bounded excerpt of an upstream error body for diagnostics.
fn excerpt(body: &[u8]) -> String {
    const LIMIT: usize = 200;
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() > LIMIT {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn an_empty_pool_exhausts_immediately() {
        let pool = ProviderPool::new().unwrap();
        let request = ChatRequest::builder().user("hi").build();

        let err = pool.chat(&request).await.unwrap_err();
        match err {
            PoolError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 0);
                assert!(matches!(*last, PoolError::NoProviders));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!pool.is_healthy());
        assert!(pool.stats().is_empty());
    }

    #[test]
    fn excerpt_trims_and_bounds_the_body() {
        assert_eq!(excerpt(b"  boom \n"), "boom");
        let long = "x".repeat(500);
        let cut = excerpt(long.as_bytes());
        assert_eq!(cut.chars().count(), 203);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn a_dropped_guard_records_a_failure() {
        let provider = Arc::new(Provider::new(ProviderConfig {
            name: "p".into(),
            kind: crate::provider::ProviderKind::Groq,
            api_key: secrecy::SecretString::from("k".to_string()),
            base_url: "http://localhost".into(),
            model: "m".into(),
            priority: 1,
            requests_per_minute: 5,
        }));

        drop(AttemptGuard::new(&provider));
        let stats = provider.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.error_count, 1);

        // a finished guard must not double-record on drop
        AttemptGuard::new(&provider).finish(true);
        let stats = provider.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.error_count, 1);
    }
}
