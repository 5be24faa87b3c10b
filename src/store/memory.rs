// ============================================================================
// In-Memory Entity Store
// ============================================================================
//
// Shared handle over every resource partition plus the change listeners.
// Mutations happen under the write lock; listeners are invoked after the
// lock is released so they are free to read the store again.
//
// ============================================================================

use super::location::{Location, StorePath};
use super::operation::Operation;
use super::state::Partition;
use crate::core::{PathPrefix, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

struct Listener {
    id: u64,
    path: StorePath,
    callback: ChangeCallback,
}

#[derive(Default)]
struct ListenerTable {
    listeners: Vec<Listener>,
}

/// Cloneable handle to a transactional store of resource partitions.
pub struct Store<S> {
    partitions: Arc<RwLock<HashMap<PathPrefix, Partition<S>>>>,
    listeners: Arc<Mutex<ListenerTable>>,
    next_listener_id: Arc<AtomicU64>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            partitions: Arc::clone(&self.partitions),
            listeners: Arc::clone(&self.listeners),
            next_listener_id: Arc::clone(&self.next_listener_id),
        }
    }
}

impl<S> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<S> Default for Store<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Store<S> {
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(RwLock::new(HashMap::new())),
            listeners: Arc::new(Mutex::new(ListenerTable::default())),
            next_listener_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Build an addressable location
    pub fn path(&self, prefix: PathPrefix, location: Location) -> StorePath {
        StorePath::new(prefix, location)
    }

    /// Whether a partition exists for `prefix`
    pub fn contains(&self, prefix: &PathPrefix) -> Result<bool> {
        Ok(self.partitions.read()?.contains_key(prefix))
    }

    /// Read from a partition. A missing partition reads as empty.
    pub fn get<T>(&self, prefix: &PathPrefix, read: impl FnOnce(&Partition<S>) -> T) -> Result<T> {
        let partitions = self.partitions.read()?;
        match partitions.get(prefix) {
            Some(partition) => Ok(read(partition)),
            None => Ok(read(&Partition::default())),
        }
    }

    /// O(1) copy of a partition for commands to compute against
    pub fn snapshot(&self, prefix: &PathPrefix) -> Result<Partition<S>> {
        self.get(prefix, Partition::clone)
    }

    /// Apply operations in order and return their inverses, already reversed:
    /// applying the returned list undoes this call.
    pub fn apply(&self, prefix: &PathPrefix, operations: Vec<Operation<S>>) -> Result<Vec<Operation<S>>> {
        let (inverses, ()) = self.update(prefix, |_| Ok((operations, ())))?;
        Ok(inverses)
    }

    /// Compute operations against the current partition and apply them under
    /// the same write lock, so no other writer can interleave between the
    /// read and the write. `compute` may hand back an extra value alongside
    /// its operations.
    ///
    /// Returns the reversed inverses and the extra value. Nothing is applied
    /// when `compute` fails.
    pub fn update<T>(
        &self,
        prefix: &PathPrefix,
        compute: impl FnOnce(&Partition<S>) -> Result<(Vec<Operation<S>>, T)>,
    ) -> Result<(Vec<Operation<S>>, T)> {
        let mut changed: Vec<Location> = Vec::new();
        let mut inverses = Vec::new();
        let extra = {
            let mut partitions = self.partitions.write()?;
            let (operations, extra) = match partitions.get(prefix) {
                Some(partition) => compute(partition)?,
                None => compute(&Partition::default())?,
            };
            if operations.is_empty() {
                return Ok((inverses, extra));
            }

            let partition = partitions.entry(*prefix).or_default();
            inverses.reserve(operations.len());
            for operation in operations {
                let location = operation.location();
                if !changed.contains(&location) {
                    changed.push(location);
                }
                inverses.push(operation.apply(partition));
            }
            extra
        };
        inverses.reverse();

        self.notify(prefix, &changed)?;
        Ok((inverses, extra))
    }

    /// Register `callback` for changes at or below (or above) `path`.
    pub fn on_change(&self, path: StorePath, callback: ChangeCallback) -> Result<Subscription> {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock()?.listeners.push(Listener {
            id,
            path,
            callback,
        });
        Ok(Subscription {
            id,
            table: Arc::downgrade(&self.listeners),
        })
    }

    pub fn listener_count(&self) -> Result<usize> {
        Ok(self.listeners.lock()?.listeners.len())
    }

    fn notify(&self, prefix: &PathPrefix, changed: &[Location]) -> Result<()> {
        let callbacks: Vec<ChangeCallback> = {
            let table = self.listeners.lock()?;
            table
                .listeners
                .iter()
                .filter(|listener| {
                    changed
                        .iter()
                        .any(|location| listener.path.observes(prefix, location))
                })
                .map(|listener| Arc::clone(&listener.callback))
                .collect()
        };

        for callback in callbacks {
            callback();
        }
        Ok(())
    }
}

/// Handle to a change listener. Removed on [`remove`](Subscription::remove)
/// or when dropped.
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            if let Ok(mut table) = table.lock() {
                table.listeners.retain(|listener| listener.id != self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
