//! Lock poisoning helpers
//!
//! A panic while a queue or registry lock is held poisons it. Rather than
//! unwrapping, callers turn the poison into their own error type with one of
//! these helpers.

use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

fn poison_message(kind: &str, detail: impl std::fmt::Debug) -> String {
    format!(
        "Internal synchronisation error ({kind} poisoned). A panic occurred while the lock was held. PoisonError: {detail:?}"
    )
}

/// Convert a poisoned `Mutex::lock` result into an application error
pub fn handle_mutex_poison<'a, T, E>(
    result: LockResult<MutexGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'a, T>, E> {
    result.map_err(|poison_err| error_constructor(poison_message("mutex", poison_err)))
}

/// Convert a poisoned `RwLock::read` result into an application error
pub fn handle_rwlock_read<'a, T, E>(
    result: LockResult<RwLockReadGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'a, T>, E> {
    result.map_err(|poison_err| error_constructor(poison_message("RwLock read", poison_err)))
}

/// Convert a poisoned `RwLock::write` result into an application error
pub fn handle_rwlock_write<'a, T, E>(
    result: LockResult<RwLockWriteGuard<'a, T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'a, T>, E> {
    result.map_err(|poison_err| error_constructor(poison_message("RwLock write", poison_err)))
}
