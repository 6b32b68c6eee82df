use crate::error::RegistryError;
use crate::events::{Event, EventKind};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle of a task: Submitted → Working → {Completed | Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Working => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Move forward to `next`; staying put is allowed, going back is not.
    pub fn advance(self, next: Self) -> Result<Self, RegistryError> {
        if self == next {
            return Ok(self);
        }
        if self.is_terminal() || next.rank() < self.rank() {
            return Err(RegistryError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        Ok(next)
    }

    /// State implied by appending `event` to a task log, if any.
    pub fn implied_by(event: &Event) -> Option<Self> {
        if event.is_final {
            return Some(if event.is_error() {
                Self::Failed
            } else {
                Self::Completed
            });
        }
        match event.kind {
            EventKind::KeepAlive {} => None,
            _ => Some(Self::Working),
        }
    }
}
