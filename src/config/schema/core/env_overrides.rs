use super::Config;
use crate::config::Role;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(role) = std::env::var("ALERTWIRE_ROLE") {
            match role.parse::<Role>() {
                Ok(role) => self.server.role = role,
                Err(_) => tracing::warn!(role = %role, "ignoring unknown ALERTWIRE_ROLE"),
            }
        }

        if let Ok(host) = std::env::var("ALERTWIRE_HOST")
            && !host.is_empty()
        {
            self.server.host = host;
        }

        if let Ok(port_str) = std::env::var("ALERTWIRE_PORT")
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.server.port = port;
        }

        if let Ok(upstream) = std::env::var("ALERTWIRE_UPSTREAM")
            && !upstream.is_empty()
        {
            self.server.upstream_url = Some(upstream);
        }

        if let Ok(level) = std::env::var("ALERTWIRE_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.level = level;
        }

        if let Ok(max_str) = std::env::var("ALERTWIRE_MAX_ITERATIONS")
            && let Ok(max) = max_str.parse::<u32>()
            && max > 0
        {
            self.agent.max_iterations = max;
        }
    }
}
