use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Idle interval before a keep-alive frame is sent (default: 25)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// `retry:` hint written in every frame (default: 3000)
    #[serde(default = "default_retry_ms")]
    pub retry_ms: u64,
    /// Per-subscriber channel capacity (default: 64)
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// Connect timeout for the upstream hop (default: 10)
    #[serde(default = "default_connect_timeout_secs")]
    pub upstream_connect_timeout_secs: u64,
}

fn default_keep_alive_secs() -> u64 {
    25
}

fn default_retry_ms() -> u64 {
    3000
}

fn default_subscriber_buffer() -> usize {
    64
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
            retry_ms: default_retry_ms(),
            subscriber_buffer: default_subscriber_buffer(),
            upstream_connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// How long a finished task stays available for resume and status (default: 3600)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Eviction sweep period (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}
