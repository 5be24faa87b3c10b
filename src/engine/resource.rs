use super::ResourceContext;
use crate::commands::{
    GotoPagePayload, InvalidatePaginationPayload, PagePayload, PaginationPayload, ReadManyPayload,
    page_count, page_number,
};
use crate::core::{
    Action, ActionKey, ActionType, BatchId, InitiatorId, Result, Status,
    StatusOptions,
};
use crate::store::{ChangeCallback, Location, PaginationCursor, Partition, Subscription};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Re-render trigger of a consumer
pub type Invalidator = ChangeCallback;

/// Explicit page window: 1-based `start` page of `size` items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub start: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOrReadOptions {
    pub pagination: Option<PageRequest>,
    /// Forwarded untouched to the configured read
    pub options: Option<Value>,
}

impl GetOrReadOptions {
    pub fn page(start: u64, size: u64) -> Self {
        Self {
            pagination: Some(PageRequest { start, size }),
            options: None,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// One consumer's view of a resource
pub struct Resource<S> {
    context: Arc<ResourceContext<S>>,
    initiator: InitiatorId,
    invalidator: Option<Invalidator>,
    subscriptions: Mutex<HashMap<String, Subscription>>,
}

impl<S> fmt::Debug for Resource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("prefix", &self.context.prefix)
            .field("initiator", &self.initiator)
            .finish_non_exhaustive()
    }
}

fn window_of(cursor: &PaginationCursor) -> PaginationPayload {
    PaginationPayload {
        offset: cursor.offset,
        size: cursor.size,
        start: cursor.start,
    }
}

impl<S: Send + Sync + 'static> Resource<S> {
    pub(crate) fn new(
        context: Arc<ResourceContext<S>>,
        initiator: InitiatorId,
        invalidator: Option<Invalidator>,
    ) -> Self {
        Self {
            context,
            initiator,
            invalidator,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn initiator(&self) -> &InitiatorId {
        &self.initiator
    }

    /// Entities for the requested window, reading them when they are not
    /// cached yet.
    ///
    /// Returns `Ok(None)` while the data is unavailable; the consumer's
    /// invalidator fires once it arrives. Read failures are recorded in the
    /// store rather than returned, only fatal errors come back as `Err`.
    pub fn get_or_read(&self, options: GetOrReadOptions) -> Result<Option<Vec<Arc<S>>>> {
        let GetOrReadOptions { pagination, options } = options;
        let key = ActionKey::READ_MANY;
        let prefix = self.context.prefix;

        let requested = pagination.map(|page| PaginationPayload::from_start(page.start, page.size));
        let (status, cursor, loaded) = self.context.store.get(&prefix, |partition| {
            let cursor = partition.cursor(&self.initiator).map(|cursor| window_of(&cursor));
            let loaded = requested.or(cursor).map(|window| {
                partition.is_page_loaded(window.loaded_key())
            });
            (partition.status_of(key, &self.initiator), cursor, loaded)
        })?;
        let window = requested.or(cursor);

        if status == Some(Status::Loading) {
            let moved = match (requested, cursor) {
                (Some(requested), Some(cursor)) => !requested.same_window(&cursor),
                (Some(_), None) => true,
                (None, _) => false,
            };
            if !moved {
                return Ok(None);
            }
        }

        let fetch_page = loaded == Some(false);
        let never_completed = matches!(status, None | Some(Status::Failed));

        let in_flight = self
            .context
            .pending
            .contains(&self.initiator, window.map(|window| window.loaded_key()))?;

        if (fetch_page || never_completed) && !in_flight {
            self.subscribe(Location::Data)?;
            if never_completed {
                self.context.track(
                    self.context
                        .executors
                        .invalidate
                        .execute(InvalidatePaginationPayload { path_prefix: prefix })?,
                )?;
            }
            self.dispatch_read(window, options)?;
        }

        self.context.store.get(&prefix, |partition| match window {
            Some(window) => partition
                .page_ids(window.size, window.offset)
                .map(|ids| partition.resolve(ids)),
            None if partition.has_status(key, Status::Completed, &self.initiator) => {
                Some(partition.ordered())
            }
            None => None,
        })
    }

    fn dispatch_read(&self, window: Option<PaginationPayload>, options: Option<Value>) -> Result<()> {
        let batch_id = BatchId::generate();
        let guard = self.context.pending.register(
            &self.initiator,
            batch_id,
            window.map(|window| window.loaded_key()),
        )?;
        let payload = ReadManyPayload {
            path_prefix: self.context.prefix,
            batch_id,
            config: self.context.config.clone(),
            initiator: self.initiator.clone(),
            action: Action::Read,
            kind: ActionType::Many,
            pagination: window,
            options,
            pending: self.context.pending.clone(),
        };
        debug!("Dispatching read for {} ({:?})", self.initiator, window);
        let execution = self.context.executors.read.execute(payload)?;
        self.context.track_read(execution, guard)
    }

    pub fn is_loading(&self, options: StatusOptions) -> Result<bool> {
        self.has_status(options, Status::Loading)
    }

    pub fn is_failed(&self, options: StatusOptions) -> Result<bool> {
        self.has_status(options, Status::Failed)
    }

    pub fn is_completed(&self, options: StatusOptions) -> Result<bool> {
        self.has_status(options, Status::Completed)
    }

    fn has_status(&self, options: StatusOptions, status: Status) -> Result<bool> {
        self.context.store.get(&self.context.prefix, |partition| {
            partition.has_status(options.key(), status, &self.initiator)
        })
    }

    pub fn page(&self) -> Pager<'_, S> {
        Pager { resource: self }
    }

    /// Read from this resource's partition
    pub fn with_partition<T>(&self, read: impl FnOnce(&Partition<S>) -> T) -> Result<T> {
        self.context.store.get(&self.context.prefix, read)
    }

    /// Subscribe to `location` once per path for the lifetime of this handle
    fn subscribe(&self, location: Location) -> Result<()> {
        let path = self.context.store.path(self.context.prefix, location);
        let mut subscriptions = self.subscriptions.lock()?;
        let key = path.to_string();
        if subscriptions.contains_key(&key) {
            return Ok(());
        }

        let invalidator = self.invalidator.clone();
        let callback: ChangeCallback = Arc::new(move || {
            if let Some(invalidate) = &invalidator {
                invalidate();
            }
        });
        let subscription = self.context.store.on_change(path, callback)?;
        subscriptions.insert(key, subscription);
        Ok(())
    }

    pub fn subscription_count(&self) -> Result<usize> {
        Ok(self.subscriptions.lock()?.len())
    }

    /// Drop every store subscription made on behalf of this consumer
    pub fn teardown(&self) -> Result<()> {
        let removed = std::mem::take(&mut *self.subscriptions.lock()?);
        debug!("Removing {} subscriptions of {}", removed.len(), self.initiator);
        drop(removed);
        Ok(())
    }

    /// Wait for every read of the owning engine to finish
    pub async fn settle(&self) -> Result<()> {
        self.context.settle().await
    }
}

/// Cursor-based page navigation of one consumer
pub struct Pager<'a, S> {
    resource: &'a Resource<S>,
}

impl<S: Send + Sync + 'static> Pager<'_, S> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Result<()> {
        self.resource.subscribe(Location::PaginationMeta)?;
        let context = &self.resource.context;
        context.track(context.executors.next_page.execute(self.payload())?)
    }

    pub fn previous(&self) -> Result<()> {
        self.resource.subscribe(Location::PaginationMeta)?;
        let context = &self.resource.context;
        context.track(context.executors.prev_page.execute(self.payload())?)
    }

    /// Move to 1-based `page`
    pub fn goto(&self, page: u64) -> Result<()> {
        self.resource.subscribe(Location::PaginationMeta)?;
        let context = &self.resource.context;
        context.track(context.executors.goto_page.execute(GotoPagePayload {
            path_prefix: context.prefix,
            initiator: self.resource.initiator.clone(),
            page,
        })?)
    }

    /// Number of pages, when the total is known
    pub fn total(&self) -> Result<Option<u64>> {
        Ok(self
            .cursor()?
            .and_then(|cursor| cursor.total.and_then(|total| page_count(total, cursor.size))))
    }

    /// 1-based current page
    pub fn current(&self) -> Result<Option<u64>> {
        Ok(self
            .cursor()?
            .map(|cursor| page_number(cursor.offset, cursor.size)))
    }

    fn cursor(&self) -> Result<Option<PaginationCursor>> {
        self.resource
            .with_partition(|partition| partition.cursor(&self.resource.initiator))
    }

    fn payload(&self) -> PagePayload {
        PagePayload {
            path_prefix: self.resource.context.prefix,
            initiator: self.resource.initiator.clone(),
        }
    }
}
