use super::pending::PendingReads;
use crate::config::{ReadPagination, ResourceConfig};
use crate::core::{Action, ActionKey, ActionType, BatchId, InitiatorId, LoadedPageKey, PathPrefix};
use crate::process::CommandPayload;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitResourcePayload {
    pub path_prefix: PathPrefix,
}

/// A requested page window. `start` is the 1-based page number of `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPayload {
    pub offset: u64,
    pub size: u64,
    pub start: u64,
}

impl PaginationPayload {
    /// Window for 1-based page `start` of `size` items
    pub fn from_start(start: u64, size: u64) -> Self {
        Self {
            offset: start.saturating_sub(1).saturating_mul(size),
            size,
            start,
        }
    }

    pub fn read_pagination(&self) -> ReadPagination {
        ReadPagination {
            offset: self.offset,
            size: self.size,
        }
    }

    pub fn same_window(&self, other: &PaginationPayload) -> bool {
        self.offset == other.offset && self.size == other.size
    }

    pub fn loaded_key(&self) -> LoadedPageKey {
        LoadedPageKey::new(self.size, self.offset)
    }
}

pub struct ReadManyPayload<S> {
    pub path_prefix: PathPrefix,
    pub batch_id: BatchId,
    pub config: ResourceConfig<S>,
    pub initiator: InitiatorId,
    pub action: Action,
    pub kind: ActionType,
    pub pagination: Option<PaginationPayload>,
    pub options: Option<Value>,
    /// Reads of the same resource still in flight
    pub pending: PendingReads,
}

impl<S> ReadManyPayload<S> {
    pub fn key(&self) -> ActionKey {
        ActionKey::new(self.action, self.kind)
    }
}

impl<S> Clone for ReadManyPayload<S> {
    fn clone(&self) -> Self {
        Self {
            path_prefix: self.path_prefix,
            batch_id: self.batch_id,
            config: self.config.clone(),
            initiator: self.initiator.clone(),
            action: self.action,
            kind: self.kind,
            pagination: self.pagination,
            options: self.options.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<S> fmt::Debug for ReadManyPayload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadManyPayload")
            .field("path_prefix", &self.path_prefix)
            .field("batch_id", &self.batch_id)
            .field("initiator", &self.initiator)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedResourcePayload {
    pub path_prefix: PathPrefix,
    pub action: Action,
    pub kind: ActionType,
    pub initiator: InitiatorId,
}

/// Payload of `next_page` / `prev_page`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePayload {
    pub path_prefix: PathPrefix,
    pub initiator: InitiatorId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotoPagePayload {
    pub path_prefix: PathPrefix,
    pub initiator: InitiatorId,
    /// 1-based
    pub page: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidatePaginationPayload {
    pub path_prefix: PathPrefix,
}

macro_rules! impl_command_payload {
    ($($payload:ty),* $(,)?) => {
        $(
            impl CommandPayload for $payload {
                fn path_prefix(&self) -> PathPrefix {
                    self.path_prefix
                }
            }
        )*
    };
}

impl_command_payload!(
    InitResourcePayload,
    FailedResourcePayload,
    PagePayload,
    GotoPagePayload,
    InvalidatePaginationPayload,
);

impl<S: 'static> CommandPayload for ReadManyPayload<S> {
    fn path_prefix(&self) -> PathPrefix {
        self.path_prefix
    }
}
