use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Engine-wide settings.
///
/// Every field carries a default so a partial TOML document (or none at
/// all) yields a usable engine pointed at a local Jackett instance.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Torznab aggregator connection.
    pub torznab: TorznabConfig,
    /// Fan-out timeouts.
    pub fanout: FanoutConfig,
    /// Availability checks and deep-link rendering.
    pub assembler: AssemblerConfig,
    /// Optional pre-fetched result cache.
    pub cache: CacheConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TorznabConfig {
    /// Base URL of the Jackett instance, e.g. `http://localhost:9117`.
    pub base_url: String,
    pub api_key: String,
    /// Force title search even for indexers advertising `imdbid`.
    pub disable_identity_search: bool,
    /// Upper bound for directory requests (milliseconds).
    pub request_timeout_ms: u64,
}

impl TorznabConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for TorznabConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9117".to_string(),
            api_key: String::new(),
            disable_identity_search: false,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FanoutConfig {
    /// Per-backend call timeout (milliseconds).
    pub indexer_timeout_ms: u64,
}

impl FanoutConfig {
    pub fn indexer_timeout(&self) -> Duration {
        Duration::from_millis(self.indexer_timeout_ms)
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            indexer_timeout_ms: 10_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Worker pool width for availability checks.
    pub max_parallel_checks: usize,
    /// Keep uncached candidates as on-demand results instead of dropping
    /// them.
    pub keep_uncached: bool,
    /// Public host serving `/playback` deep links.
    pub playback_host: String,
    /// Opaque per-user configuration segment embedded in deep links.
    pub config_token: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_parallel_checks: 8,
            keep_uncached: false,
            playback_host: "http://localhost:8000".to_string(),
            config_token: String::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Base URL of the cache service, e.g. `http://cache:3000/`.
    pub url: Option<String>,
    /// Upper bound for a whole cache lookup (milliseconds). On elapse the
    /// search goes live.
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_ms: 5_000,
        }
    }
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// URL to query, only when the cache is enabled and configured.
    pub fn active_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|url| self.enabled && !url.trim().is_empty())
    }
}
