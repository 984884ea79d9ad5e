//! Provider identity, registration shape, and runtime counters.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Backend protocol kind.
///
/// This set is closed: translators match on it exhaustively, and parsing a
/// tag outside the set fails with [`PoolError::UnsupportedProtocol`] before
/// a provider can ever be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Configuration tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Rank used to break equal-priority ties: Groq sorts first.
    pub(crate) fn tie_rank(&self) -> u8 {
        match self {
            ProviderKind::Groq => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groq" => Ok(ProviderKind::Groq),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(PoolError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Registration shape for one provider.
///
/// The credential arrives already resolved; loading it from the
/// environment or a file is the configuration layer's job.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    /// Lower is preferred.
    pub priority: u32,
    pub requests_per_minute: u32,
}

/// Mutable counters, only ever touched under the provider's own lock.
#[derive(Debug)]
struct ProviderState {
    window_count: u32,
    window_started: Instant,
    total_requests: u64,
    error_count: u64,
    last_used: Option<Instant>,
    last_used_at: Option<DateTime<Utc>>,
}

/// A registered backend endpoint plus its runtime counters.
///
/// Identity fields are immutable after registration. The counters live
/// behind this provider's own mutex, so calls against different providers
/// never contend with each other.
#[derive(Debug)]
pub struct Provider {
    name: String,
    kind: ProviderKind,
    api_key: SecretString,
    base_url: String,
    model: String,
    priority: u32,
    requests_per_minute: u32,
    state: Mutex<ProviderState>,
}

impl Provider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            name: config.name,
            kind: config.kind,
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            priority: config.priority,
            requests_per_minute: config.requests_per_minute,
            state: Mutex::new(ProviderState {
                window_count: 0,
                window_started: Instant::now(),
                total_requests: 0,
                error_count: 0,
                last_used: None,
                last_used_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    fn state(&self) -> MutexGuard<'_, ProviderState> {
        // poison only marks a panicked holder; the counters remain valid
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check-and-reset under the provider lock: reset an elapsed window,
    /// then report whether another call fits in the current one.
    pub(crate) fn window_permits(&self, window: Duration) -> bool {
        let mut state = self.state();
        if state.window_started.elapsed() >= window {
            state.window_count = 0;
            state.window_started = Instant::now();
        }
        state.window_count < self.requests_per_minute
    }

    /// Monotonic last-used instant; `None` until the first attempt.
    pub(crate) fn last_used(&self) -> Option<Instant> {
        self.state().last_used
    }

    /// Record the outcome of one dispatched attempt. Called exactly once
    /// per attempt, whatever the outcome.
    pub fn record_attempt(&self, success: bool) {
        let mut state = self.state();
        state.window_count += 1;
        state.total_requests += 1;
        if !success {
            state.error_count += 1;
        }
        state.last_used = Some(Instant::now());
        state.last_used_at = Some(Utc::now());
    }

    /// Snapshot the current counters.
    pub fn stats(&self) -> ProviderStats {
        let state = self.state();
        let success_rate = (state.total_requests > 0).then(|| {
            let succeeded = state.total_requests - state.error_count;
            succeeded as f64 / state.total_requests as f64 * 100.0
        });
        ProviderStats {
            kind: self.kind,
            priority: self.priority,
            requests_per_minute: self.requests_per_minute,
            window_count: state.window_count,
            total_requests: state.total_requests,
            error_count: state.error_count,
            last_used: state.last_used_at,
            success_rate,
        }
    }
}

/// Point-in-time statistics for one provider, as exported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub priority: u32,
    pub requests_per_minute: u32,
    pub window_count: u32,
    pub total_requests: u64,
    pub error_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    /// Absent until the first request has been recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.into(),
            kind: ProviderKind::Groq,
            api_key: SecretString::from("sk-secret".to_string()),
            base_url: "https://api.groq.com/openai/v1/".into(),
            model: "llama-3.3-70b-versatile".into(),
            priority: 1,
            requests_per_minute: 30,
        }
    }

    #[test]
    fn unknown_tags_fail_with_unsupported_protocol() {
        let err = "copilot".parse::<ProviderKind>().unwrap_err();
        match err {
            PoolError::UnsupportedProtocol(tag) => assert_eq!(tag, "copilot"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn known_tags_parse_and_roundtrip_through_serde() {
        for (tag, kind) in [
            ("groq", ProviderKind::Groq),
            ("openai", ProviderKind::OpenAi),
            ("anthropic", ProviderKind::Anthropic),
        ] {
            assert_eq!(tag.parse::<ProviderKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), serde_json::json!(tag));
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn base_url_loses_its_trailing_slash() {
        let provider = Provider::new(config("p"));
        assert_eq!(provider.base_url(), "https://api.groq.com/openai/v1");
    }

    #[test]
    fn record_attempt_moves_every_counter_once() {
        let provider = Provider::new(config("p"));
        provider.record_attempt(true);
        provider.record_attempt(false);

        let stats = provider.stats();
        assert_eq!(stats.window_count, 2);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.error_count, 1);
        assert!(stats.last_used.is_some());
        assert_eq!(stats.success_rate, Some(50.0));
    }

    #[test]
    fn success_rate_is_absent_before_any_request() {
        let provider = Provider::new(config("p"));
        let stats = provider.stats();
        assert_eq!(stats.success_rate, None);
        assert_eq!(stats.last_used, None);

        let exported = serde_json::to_value(&stats).unwrap();
        assert_eq!(exported.get("success_rate"), None);
        assert_eq!(exported.get("type").and_then(|v| v.as_str()), Some("groq"));
    }

    #[test]
    fn debug_output_never_leaks_the_credential() {
        let provider = Provider::new(config("p"));
        let debug = format!("{provider:?}");
        assert!(!debug.contains("sk-secret"));
    }
}
