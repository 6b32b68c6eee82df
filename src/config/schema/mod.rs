mod agent;
mod client;
mod core;
mod observability;
mod relay;
mod server;

pub use agent::AgentConfig;
pub use client::ClientConfig;
pub use self::core::Config;
pub use observability::ObservabilityConfig;
pub use relay::{RegistryConfig, RelayConfig};
pub use server::{Role, ServerConfig};
