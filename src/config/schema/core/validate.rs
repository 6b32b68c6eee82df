use super::Config;
use crate::error::ConfigError;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.role.is_relay() {
            let Some(upstream) = self.server.upstream_url.as_deref() else {
                return Err(ConfigError::Validation(format!(
                    "server.upstream_url is required for role {}",
                    self.server.role
                )));
            };
            let parsed = url::Url::parse(upstream).map_err(|error| {
                ConfigError::Validation(format!("server.upstream_url {upstream:?}: {error}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "server.upstream_url must be http(s), got {}",
                    parsed.scheme()
                )));
            }
        }

        let nonzero = [
            ("relay.keep_alive_secs", self.relay.keep_alive_secs),
            ("relay.retry_ms", self.relay.retry_ms),
            ("relay.subscriber_buffer", self.relay.subscriber_buffer as u64),
            (
                "relay.upstream_connect_timeout_secs",
                self.relay.upstream_connect_timeout_secs,
            ),
            ("registry.sweep_interval_secs", self.registry.sweep_interval_secs),
            ("agent.max_iterations", u64::from(self.agent.max_iterations)),
            ("agent.signal_buffer", self.agent.signal_buffer as u64),
            ("client.reconnect_delay_ms", self.client.reconnect_delay_ms),
            ("client.connect_timeout_secs", self.client.connect_timeout_secs),
        ];
        if let Some((key, _)) = nonzero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Validation(format!("{key} must be greater than zero")));
        }

        if self.agent.default_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "agent.default_agent must not be empty".to_string(),
            ));
        }
        if url::Url::parse(&self.client.base_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "client.base_url {:?} is not a valid URL",
                self.client.base_url
            )));
        }
        Ok(())
    }
}
