use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Every variable `apply_env_overrides` reads.
const OVERRIDE_VARS: [&str; 6] = [
    "ALERTWIRE_ROLE",
    "ALERTWIRE_HOST",
    "ALERTWIRE_PORT",
    "ALERTWIRE_UPSTREAM",
    "ALERTWIRE_LOG_LEVEL",
    "ALERTWIRE_MAX_ITERATIONS",
];

/// Serialized, hermetic view of the `ALERTWIRE_*` environment.
///
/// Starts with every override unset; the previous values come back on drop.
pub(super) struct EnvScope {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvScope {
    pub(super) fn clean() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        for key in OVERRIDE_VARS {
            // SAFETY: ENV_LOCK is held for the lifetime of the scope.
            unsafe { std::env::remove_var(key) };
        }
        Self { saved, _lock: lock }
    }

    pub(super) fn with(self, key: &'static str, value: &str) -> Self {
        // SAFETY: ENV_LOCK is held for the lifetime of the scope.
        unsafe { std::env::set_var(key, value) };
        self
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            // SAFETY: ENV_LOCK is released only after this loop.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
