use super::state::TaskState;
use crate::error::RegistryError;
use crate::events::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Point-in-time copy of a task, as served by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    pub event_log: Vec<Event>,
}

/// Events after a cursor plus whether the log is closed.
#[derive(Debug, Clone)]
pub struct LogSlice {
    pub events: Vec<Event>,
    pub terminal: bool,
}

struct TaskEntry {
    state: TaskState,
    created_at: DateTime<Utc>,
    finished_at: Option<Instant>,
    log: Vec<Event>,
    /// Latest appended event id; subscribers wait on this.
    head: watch::Sender<u64>,
}

impl TaskEntry {
    fn last_event_id(&self) -> u64 {
        self.log.last().map_or(0, |event| event.event_id)
    }

    fn is_closed(&self) -> bool {
        self.log.last().is_some_and(|event| event.is_final)
    }
}

/// Process-wide store of tasks and their ordered, append-only event logs.
///
/// One instance per process; every relay hop in the process reads through it.
/// Appends for a task come from a single writer (the mapper or an upstream
/// pump); reads take snapshot copies and may run concurrently with appends.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    retention: Duration,
}

impl TaskRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            retention,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn register(&self, task_id: &str) -> Result<(), RegistryError> {
        let mut tasks = self.lock();
        if tasks.contains_key(task_id) {
            return Err(RegistryError::DuplicateTask(task_id.to_string()));
        }
        let (head, _) = watch::channel(0);
        tasks.insert(
            task_id.to_string(),
            TaskEntry {
                state: TaskState::Submitted,
                created_at: Utc::now(),
                finished_at: None,
                log: Vec::new(),
                head,
            },
        );
        tracing::debug!(task_id, "task registered");
        Ok(())
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.lock().contains_key(task_id)
    }

    /// Append the next event of a task.
    ///
    /// Ids must be contiguous and nothing may follow the final event.
    /// Keep-alives are liveness signals and are never stored.
    pub fn append(&self, task_id: &str, event: Event) -> Result<(), RegistryError> {
        if event.is_keep_alive() {
            return Ok(());
        }
        if event.task_id != task_id {
            return Err(RegistryError::TaskMismatch {
                task_id: task_id.to_string(),
                got: event.task_id,
            });
        }

        let mut tasks = self.lock();
        let entry = tasks
            .get_mut(task_id)
            .ok_or_else(|| RegistryError::UnknownTask(task_id.to_string()))?;
        if entry.is_closed() {
            return Err(RegistryError::AlreadyTerminal(task_id.to_string()));
        }
        let expected = entry.last_event_id() + 1;
        if event.event_id != expected {
            return Err(RegistryError::OutOfOrder {
                task_id: task_id.to_string(),
                expected,
                got: event.event_id,
            });
        }
        if let Some(next) = TaskState::implied_by(&event) {
            entry.state = entry.state.advance(next)?;
        }
        if event.is_final {
            entry.finished_at = Some(Instant::now());
        }
        let event_id = event.event_id;
        entry.log.push(event);
        entry.head.send_replace(event_id);
        Ok(())
    }

    pub fn get_log(&self, task_id: &str) -> Option<Vec<Event>> {
        self.lock().get(task_id).map(|entry| entry.log.clone())
    }

    pub fn get_state(&self, task_id: &str) -> Option<TaskState> {
        self.lock().get(task_id).map(|entry| entry.state)
    }

    pub fn last_event_id(&self, task_id: &str) -> Option<u64> {
        self.lock().get(task_id).map(TaskEntry::last_event_id)
    }

    /// Events with `event_id > after`, in log order.
    pub fn events_after(&self, task_id: &str, after: u64) -> Option<LogSlice> {
        let tasks = self.lock();
        let entry = tasks.get(task_id)?;
        let start = entry.log.partition_point(|event| event.event_id <= after);
        Some(LogSlice {
            events: entry.log[start..].to_vec(),
            terminal: entry.is_closed(),
        })
    }

    pub fn snapshot(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.lock().get(task_id).map(|entry| TaskSnapshot {
            task_id: task_id.to_string(),
            state: entry.state,
            created_at: entry.created_at,
            event_log: entry.log.clone(),
        })
    }

    /// Receiver that changes whenever the task's log grows.
    pub fn watch(&self, task_id: &str) -> Option<watch::Receiver<u64>> {
        self.lock().get(task_id).map(|entry| entry.head.subscribe())
    }

    pub fn task_count(&self) -> usize {
        self.lock().len()
    }

    /// Drop terminal tasks older than the retention window.
    pub fn evict_expired(&self) -> Vec<String> {
        self.evict_expired_at(Instant::now())
    }

    pub fn evict_expired_at(&self, now: Instant) -> Vec<String> {
        let mut tasks = self.lock();
        let expired: Vec<String> = tasks
            .iter()
            .filter(|(_, entry)| {
                entry
                    .finished_at
                    .is_some_and(|finished| now.saturating_duration_since(finished) >= self.retention)
            })
            .map(|(task_id, _)| task_id.clone())
            .collect();
        for task_id in &expired {
            tasks.remove(task_id);
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "evicted finished tasks");
        }
        expired
    }
}
