// ============================================================================
// Patch Operations
// ============================================================================
//
// Reversible mutations of a partition. Applying an operation returns its
// inverse, captured from the value it replaced, so a sequence of applied
// operations can be undone by applying the inverses in reverse order.
//
// ============================================================================

use super::location::Location;
use super::state::{ItemMeta, OrderBatch, PageSet, PaginationCursor, Partition, StatusLists};
use crate::core::{ActionKey, InitiatorId, LoadedPageKey, Status, SyntheticId};
use std::sync::Arc;

/// A single reversible change to one partition
#[derive(Debug)]
pub enum Operation<S> {
    /// Replace the whole `meta.actions` tree (`None` = uninitialized)
    ReplaceActions(Option<im::OrdMap<ActionKey, StatusLists>>),

    ReplaceData(im::HashMap<SyntheticId, Arc<S>>),

    ReplaceIdMap(im::HashMap<String, SyntheticId>),

    ReplaceOrder(im::Vector<OrderBatch>),

    ReplaceItems(im::HashMap<SyntheticId, ItemMeta>),

    /// Move an initiator to `status` within one action + type. `index` pins
    /// the list position; inverses use it to restore the original order.
    SetStatus {
        key: ActionKey,
        initiator: InitiatorId,
        status: Option<Status>,
        index: Option<usize>,
    },

    ReplaceCursor {
        initiator: InitiatorId,
        cursor: Option<PaginationCursor>,
    },

    ReplacePageSet {
        size: u64,
        set: Option<PageSet>,
    },

    ReplaceLoadedPages(im::Vector<LoadedPageKey>),
}

impl<S> Clone for Operation<S> {
    fn clone(&self) -> Self {
        match self {
            Operation::ReplaceActions(actions) => Operation::ReplaceActions(actions.clone()),
            Operation::ReplaceData(data) => Operation::ReplaceData(data.clone()),
            Operation::ReplaceIdMap(map) => Operation::ReplaceIdMap(map.clone()),
            Operation::ReplaceOrder(order) => Operation::ReplaceOrder(order.clone()),
            Operation::ReplaceItems(items) => Operation::ReplaceItems(items.clone()),
            Operation::SetStatus {
                key,
                initiator,
                status,
                index,
            } => Operation::SetStatus {
                key: *key,
                initiator: initiator.clone(),
                status: *status,
                index: *index,
            },
            Operation::ReplaceCursor { initiator, cursor } => Operation::ReplaceCursor {
                initiator: initiator.clone(),
                cursor: *cursor,
            },
            Operation::ReplacePageSet { size, set } => Operation::ReplacePageSet {
                size: *size,
                set: set.clone(),
            },
            Operation::ReplaceLoadedPages(pages) => Operation::ReplaceLoadedPages(pages.clone()),
        }
    }
}

impl<S> Operation<S> {
    /// The location this operation writes to
    pub fn location(&self) -> Location {
        match self {
            Operation::ReplaceActions(_) => Location::Actions,
            Operation::ReplaceData(_) => Location::Data,
            Operation::ReplaceIdMap(_) => Location::IdMap,
            Operation::ReplaceOrder(_) => Location::Order,
            Operation::ReplaceItems(_) => Location::MetaItems,
            Operation::SetStatus { key, .. } => Location::ActionStatus(*key),
            Operation::ReplaceCursor { initiator, .. } => Location::Cursor(initiator.clone()),
            Operation::ReplacePageSet { size, .. } => Location::PageSet(*size),
            Operation::ReplaceLoadedPages(_) => Location::LoadedPages,
        }
    }

    /// Apply to `partition` and return the inverse operation.
    pub fn apply(self, partition: &mut Partition<S>) -> Operation<S> {
        match self {
            Operation::ReplaceActions(actions) => {
                Operation::ReplaceActions(std::mem::replace(&mut partition.meta.actions, actions))
            }
            Operation::ReplaceData(data) => {
                Operation::ReplaceData(std::mem::replace(&mut partition.data, data))
            }
            Operation::ReplaceIdMap(map) => {
                Operation::ReplaceIdMap(std::mem::replace(&mut partition.id_map, map))
            }
            Operation::ReplaceOrder(order) => {
                Operation::ReplaceOrder(std::mem::replace(&mut partition.order, order))
            }
            Operation::ReplaceItems(items) => {
                Operation::ReplaceItems(std::mem::replace(&mut partition.meta.items, items))
            }
            Operation::SetStatus {
                key,
                initiator,
                status,
                index,
            } => {
                let actions = partition.meta.actions.get_or_insert_with(im::OrdMap::new);
                let mut lists = actions.get(&key).cloned().unwrap_or_default();
                let previous = lists.position_of(&initiator);
                lists.set_at(&initiator, status, index);
                actions.insert(key, lists);
                Operation::SetStatus {
                    key,
                    initiator,
                    status: previous.map(|(status, _)| status),
                    index: previous.map(|(_, index)| index),
                }
            }
            Operation::ReplaceCursor { initiator, cursor } => {
                let current = &mut partition.meta.pagination.current;
                let previous = match cursor {
                    Some(cursor) => current.insert(initiator.clone(), cursor),
                    None => current.remove(&initiator),
                };
                Operation::ReplaceCursor {
                    initiator,
                    cursor: previous,
                }
            }
            Operation::ReplacePageSet { size, set } => {
                let previous = match set {
                    Some(set) => partition.pagination.insert(size, set),
                    None => partition.pagination.remove(&size),
                };
                Operation::ReplacePageSet {
                    size,
                    set: previous,
                }
            }
            Operation::ReplaceLoadedPages(pages) => Operation::ReplaceLoadedPages(
                std::mem::replace(&mut partition.meta.pagination.loaded_pages, pages),
            ),
        }
    }
}
