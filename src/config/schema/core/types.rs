use super::super::{
    AgentConfig, ClientConfig, ObservabilityConfig, RegistryConfig, RelayConfig, ServerConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.relay.keep_alive_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.registry.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.registry.sweep_interval_secs)
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.relay.upstream_connect_timeout_secs)
    }
}
