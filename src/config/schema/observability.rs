use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "none" | "log"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Max tracing level: "error" | "warn" | "info" | "debug" | "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_backend() -> String {
    "log".into()
}

fn default_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            level: default_level(),
        }
    }
}
