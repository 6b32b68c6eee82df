use crate::events::Source;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which boundary this process serves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    /// Runs reasoning loops; innermost hop.
    #[default]
    Worker,
    /// Relays from a worker.
    Coordinator,
    /// Edge-facing hop clients connect to.
    Gateway,
}

impl Role {
    /// Coordinator and gateway pull their events from an upstream hop.
    pub fn is_relay(self) -> bool {
        !matches!(self, Self::Worker)
    }

    /// `source` stamped on events this role synthesizes.
    pub fn source(self) -> Source {
        match self {
            Self::Worker => Source::Worker,
            Self::Coordinator => Source::Coordinator,
            Self::Gateway => Source::Gateway,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub role: Role,
    /// Bind host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port (default: 7700)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Next hop inward; required for coordinator and gateway
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,
    /// Allowed CORS origins; empty disables the CORS layer
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    7700
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            role: Role::default(),
            host: default_host(),
            port: default_port(),
            upstream_url: None,
            cors_origins: Vec::new(),
        }
    }
}
