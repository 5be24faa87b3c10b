use crate::core::{BatchId, InitiatorId, LoadedPageKey, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRead {
    batch: BatchId,
    /// `None` for unpaginated reads
    window: Option<LoadedPageKey>,
}

/// Reads dispatched per initiator that have not finished yet.
///
/// An entry is added before the read is dispatched and leaves either when
/// the read normalizes its response or when its [`PendingGuard`] drops.
#[derive(Debug, Clone, Default)]
pub struct PendingReads {
    reads: Arc<Mutex<HashMap<InitiatorId, Vec<PendingRead>>>>,
}

impl PendingReads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read of `window` for `initiator`
    pub fn register(
        &self,
        initiator: &InitiatorId,
        batch: BatchId,
        window: Option<LoadedPageKey>,
    ) -> Result<PendingGuard> {
        self.reads
            .lock()?
            .entry(initiator.clone())
            .or_default()
            .push(PendingRead { batch, window });
        Ok(PendingGuard {
            reads: self.clone(),
            initiator: initiator.clone(),
            batch,
        })
    }

    /// Whether a read of exactly `window` is in flight for `initiator`
    pub fn contains(&self, initiator: &InitiatorId, window: Option<LoadedPageKey>) -> Result<bool> {
        Ok(self
            .reads
            .lock()?
            .get(initiator)
            .is_some_and(|reads| reads.iter().any(|read| read.window == window)))
    }

    pub fn count(&self, initiator: &InitiatorId) -> Result<usize> {
        Ok(self.reads.lock()?.get(initiator).map_or(0, Vec::len))
    }

    /// Remove the read of `batch` and report whether other reads of
    /// `initiator` are still in flight.
    pub fn finish(&self, initiator: &InitiatorId, batch: BatchId) -> Result<bool> {
        let mut reads = self.reads.lock()?;
        let Some(entries) = reads.get_mut(initiator) else {
            return Ok(false);
        };
        entries.retain(|read| read.batch != batch);
        let others = !entries.is_empty();
        if !others {
            reads.remove(initiator);
        }
        Ok(others)
    }
}

/// Removes its read from [`PendingReads`] when dropped
#[derive(Debug)]
pub struct PendingGuard {
    reads: PendingReads,
    initiator: InitiatorId,
    batch: BatchId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        // poisoned registry: nothing left to clean up
        let _ = self.reads.finish(&self.initiator, self.batch);
    }
}
