// ============================================================================
// Resource Partition State
// ============================================================================
//
// Typed tree of one resource partition. Collections are persistent `im`
// structures, so cloning a partition for a command snapshot is O(1) and a
// read-modify-write of a whole map shares structure with the previous value.
//
// ============================================================================

use crate::core::{ActionKey, BatchId, InitiatorId, LoadedPageKey, Status, SyntheticId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Initiators currently in each status for one action + type.
///
/// An initiator is a member of at most one list at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLists {
    pub loading: Vec<InitiatorId>,
    pub failed: Vec<InitiatorId>,
    pub completed: Vec<InitiatorId>,
}

impl StatusLists {
    pub fn list(&self, status: Status) -> &[InitiatorId] {
        match status {
            Status::Loading => &self.loading,
            Status::Failed => &self.failed,
            Status::Completed => &self.completed,
        }
    }

    pub fn contains(&self, status: Status, initiator: &InitiatorId) -> bool {
        self.list(status).contains(initiator)
    }

    pub fn status_of(&self, initiator: &InitiatorId) -> Option<Status> {
        [Status::Loading, Status::Failed, Status::Completed]
            .into_iter()
            .find(|status| self.contains(*status, initiator))
    }

    /// Status and list position of `initiator`, if it is a member of any list.
    pub fn position_of(&self, initiator: &InitiatorId) -> Option<(Status, usize)> {
        [Status::Loading, Status::Failed, Status::Completed]
            .into_iter()
            .find_map(|status| {
                self.list(status)
                    .iter()
                    .position(|id| id == initiator)
                    .map(|index| (status, index))
            })
    }

    /// Move `initiator` into `status` (or out of every list for `None`).
    pub fn set(&mut self, initiator: &InitiatorId, status: Option<Status>) {
        self.set_at(initiator, status, None);
    }

    /// Like [`set`](Self::set), inserting at `index` instead of appending.
    pub fn set_at(&mut self, initiator: &InitiatorId, status: Option<Status>, index: Option<usize>) {
        self.loading.retain(|id| id != initiator);
        self.failed.retain(|id| id != initiator);
        self.completed.retain(|id| id != initiator);

        let target = match status {
            Some(Status::Loading) => &mut self.loading,
            Some(Status::Failed) => &mut self.failed,
            Some(Status::Completed) => &mut self.completed,
            None => return,
        };
        match index {
            Some(index) => target.insert(index.min(target.len()), initiator.clone()),
            None => target.push(initiator.clone()),
        }
    }

    pub fn completed_by(initiator: &InitiatorId) -> Self {
        Self {
            completed: vec![initiator.clone()],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    pub read: StatusLists,
}

/// Cached pages of one page size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    pub total: u64,
    pub pages: im::OrdMap<u64, Vec<SyntheticId>>,
}

/// Per-initiator pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub offset: u64,
    pub size: u64,
    /// 1-based page number of `offset`
    pub start: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationMeta {
    pub loaded_pages: im::Vector<LoadedPageKey>,
    pub current: im::HashMap<InitiatorId, PaginationCursor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMeta {
    pub items: im::HashMap<SyntheticId, ItemMeta>,
    /// `None` until the resource has been initialized
    pub actions: Option<im::OrdMap<ActionKey, StatusLists>>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBatch {
    pub batch: BatchId,
    pub ids: Vec<SyntheticId>,
}

/// The store partition of one resource configuration.
#[derive(Debug, PartialEq)]
pub struct Partition<S> {
    pub data: im::HashMap<SyntheticId, Arc<S>>,
    pub id_map: im::HashMap<String, SyntheticId>,
    pub order: im::Vector<OrderBatch>,
    pub pagination: im::OrdMap<u64, PageSet>,
    pub meta: ResourceMeta,
}

// Manual impls: entities sit behind `Arc`, so neither needs `S: Clone`/`S: Default`.
impl<S> Clone for Partition<S> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            id_map: self.id_map.clone(),
            order: self.order.clone(),
            pagination: self.pagination.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<S> Default for Partition<S> {
    fn default() -> Self {
        Self {
            data: im::HashMap::new(),
            id_map: im::HashMap::new(),
            order: im::Vector::new(),
            pagination: im::OrdMap::new(),
            meta: ResourceMeta::default(),
        }
    }
}

impl<S> Partition<S> {
    pub fn status_lists(&self, key: ActionKey) -> Option<&StatusLists> {
        self.meta.actions.as_ref().and_then(|actions| actions.get(&key))
    }

    pub fn status_of(&self, key: ActionKey, initiator: &InitiatorId) -> Option<Status> {
        self.status_lists(key)
            .and_then(|lists| lists.status_of(initiator))
    }

    pub fn has_status(&self, key: ActionKey, status: Status, initiator: &InitiatorId) -> bool {
        self.status_lists(key)
            .is_some_and(|lists| lists.contains(status, initiator))
    }

    pub fn cursor(&self, initiator: &InitiatorId) -> Option<PaginationCursor> {
        self.meta.pagination.current.get(initiator).copied()
    }

    pub fn is_page_loaded(&self, key: LoadedPageKey) -> bool {
        self.meta.pagination.loaded_pages.contains(&key)
    }

    pub fn page_ids(&self, size: u64, offset: u64) -> Option<&Vec<SyntheticId>> {
        self.pagination
            .get(&size)
            .and_then(|set| set.pages.get(&offset))
    }

    /// Resolve synthetic ids through `data`, skipping ids without an entity.
    pub fn resolve(&self, ids: &[SyntheticId]) -> Vec<Arc<S>> {
        ids.iter()
            .filter_map(|id| self.data.get(id).cloned())
            .collect()
    }

    /// Every entity of every unpaginated batch, in batch order.
    pub fn ordered(&self) -> Vec<Arc<S>> {
        self.order
            .iter()
            .flat_map(|batch| batch.ids.iter())
            .filter_map(|id| self.data.get(id).cloned())
            .collect()
    }

    pub fn entity_by_business_id(&self, business_id: &str) -> Option<Arc<S>> {
        self.id_map
            .get(business_id)
            .and_then(|id| self.data.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lists_membership_is_exclusive() {
        let a = InitiatorId::new("a");
        let mut lists = StatusLists::default();

        lists.set(&a, Some(Status::Loading));
        assert_eq!(lists.status_of(&a), Some(Status::Loading));

        lists.set(&a, Some(Status::Completed));
        assert!(lists.loading.is_empty());
        assert_eq!(lists.completed, vec![a.clone()]);

        lists.set(&a, Some(Status::Failed));
        assert!(lists.completed.is_empty());
        assert_eq!(lists.status_of(&a), Some(Status::Failed));

        lists.set(&a, None);
        assert_eq!(lists.status_of(&a), None);
    }

    #[test]
    fn test_status_lists_keep_other_initiators() {
        let a = InitiatorId::new("a");
        let b = InitiatorId::new("b");
        let mut lists = StatusLists::default();
        lists.set(&a, Some(Status::Loading));
        lists.set(&b, Some(Status::Loading));
        lists.set(&a, Some(Status::Completed));

        assert_eq!(lists.loading, vec![b]);
        assert_eq!(lists.completed, vec![a]);
    }

    #[test]
    fn test_ordered_skips_missing_entities() {
        let mut partition: Partition<u32> = Partition::default();
        let present = SyntheticId::generate();
        let missing = SyntheticId::generate();
        partition.data.insert(present, Arc::new(7));
        partition.order.push_back(OrderBatch {
            batch: BatchId::generate(),
            ids: vec![missing, present],
        });

        let values: Vec<u32> = partition.ordered().iter().map(|v| **v).collect();
        assert_eq!(values, vec![7]);
    }
}
