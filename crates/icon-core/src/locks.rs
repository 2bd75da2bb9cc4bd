//! Keyed async locks: one mutex per icon name, created on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use icon_types::IconName;

type Table = HashMap<IconName, Arc<AsyncMutex<()>>>;

/// Lock table serializing mutations per icon name.
///
/// Holders of different names never wait on each other. An entry is dropped
/// once its last holder or waiter goes away, so the table only grows with
/// the number of names being mutated at the same time.
#[derive(Clone, Default)]
pub struct NameLocks {
    table: Arc<Mutex<Table>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn acquire(&self, name: &IconName) -> NameGuard {
        let entry = {
            let mut table = lock_table(&self.table);
            Arc::clone(table.entry(name.clone()).or_default())
        };
        let guard = entry.lock_owned().await;
        NameGuard {
            name: name.clone(),
            table: Arc::clone(&self.table),
            guard: Some(guard),
        }
    }

    /// Number of names currently held or awaited.
    pub fn active(&self) -> usize {
        lock_table(&self.table).len()
    }
}

// The table holds no invariant a panicking holder could break.
fn lock_table(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive hold on one icon name; released on drop.
pub struct NameGuard {
    name: IconName,
    table: Arc<Mutex<Table>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl NameGuard {
    pub fn name(&self) -> &IconName {
        &self.name
    }
}

impl Drop for NameGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = lock_table(&self.table);
        if table
            .get(&self.name)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(&self.name);
        }
    }
}
