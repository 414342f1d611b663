//! Swarm configuration.
//!
//! Defaults are suitable for small provider sets; large directories should set
//! `max_concurrency`. Every field can be overridden from the environment.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_MAX_CONCURRENCY: &str = "CALLPILOT_MAX_CONCURRENCY";
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "CALLPILOT_PROVIDER_TIMEOUT_MS";
pub const ENV_EVENT_BUFFER: &str = "CALLPILOT_EVENT_BUFFER";
pub const ENV_SIMULATED_LATENCY_MS: &str = "CALLPILOT_SIMULATED_LATENCY_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Maximum negotiations in flight. `None` runs every provider at once.
    pub max_concurrency: Option<usize>,
    /// Deadline for a single provider's negotiation (milliseconds).
    pub provider_timeout_ms: u64,
    /// Capacity of the stream event channel.
    pub event_buffer: usize,
    /// Delay of the simulated provider line (milliseconds).
    pub simulated_latency_ms: u64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            provider_timeout_ms: 10_000,
            event_buffer: 64,
            simulated_latency_ms: 0,
        }
    }
}

impl SwarmConfig {
    /// Defaults overridden by any `CALLPILOT_*` variables that are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SwarmConfig::from_env`] with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(n) = parse_var::<usize, _>(&lookup, ENV_MAX_CONCURRENCY) {
            config.max_concurrency = (n > 0).then_some(n);
        }
        if let Some(ms) = parse_var(&lookup, ENV_PROVIDER_TIMEOUT_MS) {
            config.provider_timeout_ms = ms;
        }
        if let Some(n) = parse_var::<usize, _>(&lookup, ENV_EVENT_BUFFER) {
            config.event_buffer = n.max(1);
        }
        if let Some(ms) = parse_var(&lookup, ENV_SIMULATED_LATENCY_MS) {
            config.simulated_latency_ms = ms;
        }
        config
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = (max > 0).then_some(max);
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
