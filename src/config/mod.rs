pub mod schema;

pub use schema::{
    AgentConfig, ClientConfig, Config, ObservabilityConfig, RegistryConfig, RelayConfig, Role,
    ServerConfig,
};
