//! Gate configuration and shared handler state.

use std::sync::Arc;
use std::time::Duration;

use super::provider::IdentityProvider;
use super::rate_limit::CounterStore;

pub(crate) const DEFAULT_WINDOW_SECONDS: u64 = 5 * 60;
pub(crate) const DEFAULT_ATTEMPT_LIMIT: i64 = 5;
const DEFAULT_ALLOWED_ORIGINS: &[&str] =
    &["https://stellina-ristorante.de", "http://localhost:5173"];

/// Explicit configuration for both handlers. The first allowed origin doubles
/// as the fallback for unrecognized `Origin` headers.
#[derive(Clone, Debug)]
pub struct GateConfig {
    window: Duration,
    attempt_limit: i64,
    allowed_origins: Vec<String>,
}

impl GateConfig {
    #[must_use]
    pub fn new(allowed_origins: Vec<String>) -> Self {
        let allowed_origins = if allowed_origins.is_empty() {
            DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            allowed_origins
        };

        Self {
            window: Duration::from_secs(DEFAULT_WINDOW_SECONDS),
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
            allowed_origins,
        }
    }

    #[must_use]
    pub fn with_window_seconds(mut self, seconds: u64) -> Self {
        self.window = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn with_attempt_limit(mut self, limit: i64) -> Self {
        self.attempt_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub fn attempt_limit(&self) -> i64 {
        self.attempt_limit
    }

    #[must_use]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    pub(crate) fn fallback_origin(&self) -> &str {
        &self.allowed_origins[0]
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// State shared by the login and verify-admin handlers.
pub struct GateState {
    config: GateConfig,
    counters: Arc<dyn CounterStore>,
    provider: Arc<dyn IdentityProvider>,
}

impl GateState {
    pub fn new(
        config: GateConfig,
        counters: Arc<dyn CounterStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            counters,
            provider,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub(crate) fn counters(&self) -> &dyn CounterStore {
        self.counters.as_ref()
    }

    pub(crate) fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }
}
