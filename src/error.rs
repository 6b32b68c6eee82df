use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `AlertWire`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide how to surface a failure; process edges (CLI, server
/// bootstrap) continue to use `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum WireError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Task registry ───────────────────────────────────────────────────
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    // ── Capabilities ────────────────────────────────────────────────────
    #[error("capability: {0}")]
    Capability(#[from] CapabilityError),

    // ── Relay hops ──────────────────────────────────────────────────────
    #[error("relay: {0}")]
    Relay(#[from] RelayError),

    // ── HTTP / SSE transport ────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Timeline client ─────────────────────────────────────────────────
    #[error("client: {0}")]
    Client(#[from] ClientError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Registry errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("task {0} is not registered")]
    UnknownTask(String),

    #[error("task {0} is already registered")]
    DuplicateTask(String),

    #[error("task {task_id}: expected event {expected}, got {got}")]
    OutOfOrder {
        task_id: String,
        expected: u64,
        got: u64,
    },

    #[error("task {0} already delivered its terminal event")]
    AlreadyTerminal(String),

    #[error("event for task {got} appended to task {task_id}")]
    TaskMismatch { task_id: String, got: String },

    #[error("invalid state transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

// ─── Capability errors ───────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("capability {name} not found")]
    NotFound { name: String },

    #[error("capability {name} failed: {message}")]
    Failed { name: String, message: String },
}

impl CapabilityError {
    pub fn name(&self) -> &str {
        match self {
            Self::NotFound { name } | Self::Failed { name, .. } => name,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NotFound { name } => format!("capability {name} is not registered"),
            Self::Failed { message, .. } => message.clone(),
        }
    }
}

// ─── Relay errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("task {0} is unknown to this hop")]
    UnknownTask(String),

    #[error("unknown agent {0}")]
    UnknownAgent(String),

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ─── Transport errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("{url} answered with status {code}")]
    Status { url: String, code: u16 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("stream interrupted: {0}")]
    Stream(String),

    #[error("malformed frame: {0}")]
    Decode(String),
}

impl TransportError {
    /// Whether a client may reconnect after this error.
    ///
    /// Missing tasks and client-side (4xx) rejections are permanent; anything
    /// that looks like a dropped or refused connection is a disconnect.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect { .. } | Self::Stream(_) => true,
            Self::Status { code, .. } => *code >= 500,
            Self::NotFound(_) | Self::Decode(_) => false,
        }
    }
}

// ─── Client errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("stream lost after {attempts} reconnect attempts; giving up")]
    ReconnectExhausted { attempts: u32 },

    #[error("task failed{}: {message}", .capability.as_deref().map(|c| format!(" in {c}")).unwrap_or_default())]
    TaskFailed {
        message: String,
        capability: Option<String>,
    },

    #[error("event stream skipped from {expected} to {got}")]
    Gap { expected: u64, got: u64 },

    #[error("task {0} not found")]
    NotFound(String),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, WireError>;
