//! Table Lock Manager
//!
//! Per-table exclusive locks. A table is either Unlocked or Locked; only locked
//! tables have an entry in the registry. Each entry carries the wait list that
//! `await_free` callers park on until the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Lock Manager (Table -> wait list of the current lock)
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<Notify>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<Notify>>> {
        // The map stays consistent even if a holder panicked mid-operation
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the table lock without waiting
    pub fn lock(&self, table: &str) -> Result<()> {
        let mut locks = self.registry();
        if locks.contains_key(table) {
            debug!(table, "lock contention");
            return Err(Error::TableAlreadyLocked(table.to_string()));
        }
        locks.insert(table.to_string(), Arc::new(Notify::new()));
        trace!(table, "table locked");
        Ok(())
    }

    /// Release the table lock and wake everyone waiting for it
    pub fn release_lock(&self, table: &str) {
        let released = self.registry().remove(table);
        if let Some(waiters) = released {
            trace!(table, "table unlocked");
            waiters.notify_waiters();
        }
    }

    /// Acquire the lock and hand back a guard that releases it when dropped
    pub fn try_lock_guard(&self, table: &str) -> Result<TableLockGuard<'_>> {
        self.lock(table)?;
        Ok(TableLockGuard {
            manager: self,
            table: table.to_string(),
        })
    }

    pub fn is_locked(&self, table: &str) -> bool {
        self.registry().contains_key(table)
    }

    /// Names of the currently locked tables, sorted
    pub fn locked_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.registry().keys().cloned().collect();
        tables.sort();
        tables
    }

    /// Wait until the table is observed unlocked.
    ///
    /// This never takes the lock; a caller that wants it must still call
    /// [`lock`](Self::lock) and may lose the race to another caller. Dropping
    /// the future abandons the wait without touching lock state.
    pub async fn await_free(&self, table: &str) {
        loop {
            let waiters = match self.registry().get(table) {
                Some(waiters) => Arc::clone(waiters),
                None => return,
            };

            // Register before re-checking so a release in between is not missed
            let notified = waiters.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_locked_by(table, &waiters) {
                return;
            }
            notified.await;
        }
    }

    /// [`await_free`](Self::await_free) with a deadline
    pub async fn await_free_timeout(&self, table: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.await_free(table))
            .await
            .map_err(|_| Error::LockTimeout(table.to_string()))
    }

    /// Whether the lock that owns `waiters` is still the one held on `table`
    fn is_locked_by(&self, table: &str, waiters: &Arc<Notify>) -> bool {
        self.registry()
            .get(table)
            .map_or(false, |current| Arc::ptr_eq(current, waiters))
    }
}

/// Holds a table lock for as long as it lives
#[derive(Debug)]
pub struct TableLockGuard<'a> {
    manager: &'a LockManager,
    table: String,
}

impl TableLockGuard<'_> {
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Drop for TableLockGuard<'_> {
    fn drop(&mut self) {
        self.manager.release_lock(&self.table);
    }
}
