use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Reasoning loop bound (default: 10)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Planner used when a submission names none (default: "scripted")
    #[serde(default = "default_agent")]
    pub default_agent: String,
    /// Controller -> mapper channel capacity (default: 256)
    #[serde(default = "default_signal_buffer")]
    pub signal_buffer: usize,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_agent() -> String {
    "scripted".into()
}

fn default_signal_buffer() -> usize {
    256
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            default_agent: default_agent(),
            signal_buffer: default_signal_buffer(),
        }
    }
}
