// ============================================================================
// Resource Engine
// ============================================================================
//
// Owns everything one resource configuration needs at runtime: its partition
// prefix, the configuration, the processes bound to the store and the reads
// still in flight. Consumers get a `Resource` handle each.
//
// ============================================================================

pub mod resource;

pub use resource::{GetOrReadOptions, Invalidator, PageRequest, Pager, Resource};

use crate::commands::{
    FailedResourcePayload, GotoPagePayload, InitResourcePayload, InvalidatePaginationPayload,
    PagePayload, PendingGuard, PendingReads, ReadManyPayload, before_read_many, failed_resource, goto_page,
    initialize_resource, invalidate_pagination, next_page, prev_page, read_many,
};
use crate::config::ResourceConfig;
use crate::core::{InitiatorId, PathPrefix, ResourceError, Result};
use crate::process::{Execution, Process, ProcessExecutor};
use crate::store::Store;
use log::{debug, error, warn};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// The processes of one resource, bound to its store
pub(crate) struct Executors<S> {
    pub(crate) read: ProcessExecutor<S, ReadManyPayload<S>>,
    pub(crate) invalidate: ProcessExecutor<S, InvalidatePaginationPayload>,
    pub(crate) next_page: ProcessExecutor<S, PagePayload>,
    pub(crate) prev_page: ProcessExecutor<S, PagePayload>,
    pub(crate) goto_page: ProcessExecutor<S, GotoPagePayload>,
}

impl<S: Send + Sync + 'static> Executors<S> {
    fn bind(store: &Store<S>) -> Self {
        let failed = Process::new("failed-resource", vec![failed_resource]).bind(store);

        let on_read_failure = Arc::new(move |_: &Store<S>, payload: &ReadManyPayload<S>, err: &ResourceError| {
            warn!("Read for {} failed: {}", payload.initiator, err);
            if let Err(err) = payload.pending.finish(&payload.initiator, payload.batch_id) {
                error!("Could not release read of {}: {}", payload.initiator, err);
            }
            let recorded = failed.execute(FailedResourcePayload {
                path_prefix: payload.path_prefix,
                action: payload.action,
                kind: payload.kind,
                initiator: payload.initiator.clone(),
            });
            if let Err(err) = recorded {
                error!("Could not record read failure for {}: {}", payload.initiator, err);
            }
        });

        Self {
            read: Process::new("read-many", vec![before_read_many, read_many])
                .with_recovery(on_read_failure)
                .bind(store),
            invalidate: Process::new("invalidate-pagination", vec![invalidate_pagination])
                .bind(store),
            next_page: Process::new("next-page", vec![next_page]).bind(store),
            prev_page: Process::new("prev-page", vec![prev_page]).bind(store),
            goto_page: Process::new("goto-page", vec![goto_page]).bind(store),
        }
    }
}

pub(crate) struct ResourceContext<S> {
    pub(crate) prefix: PathPrefix,
    pub(crate) config: ResourceConfig<S>,
    pub(crate) store: Store<S>,
    pub(crate) executors: Executors<S>,
    pub(crate) pending: PendingReads,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl<S> ResourceContext<S> {
    pub(crate) fn track(&self, execution: Execution) -> Result<()> {
        if let Execution::Pending(handle) = execution {
            self.push_in_flight(handle)?;
        }
        Ok(())
    }

    /// Track a read execution; its pending entry is released once the
    /// read's task has finished, or right away when nothing is in flight.
    pub(crate) fn track_read(&self, execution: Execution, guard: PendingGuard) -> Result<()> {
        let Execution::Pending(handle) = execution else {
            return Ok(());
        };
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| ResourceError::Runtime(err.to_string()))?;
        let watcher = runtime.spawn(async move {
            if let Err(err) = handle.await {
                error!("Read task ended abnormally: {}", err);
            }
            drop(guard);
        });
        self.push_in_flight(watcher)
    }

    fn push_in_flight(&self, handle: JoinHandle<()>) -> Result<()> {
        let mut in_flight = self.in_flight.lock()?;
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(handle);
        Ok(())
    }

    async fn settle(&self) -> Result<()> {
        loop {
            let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.in_flight.lock()?);
            if pending.is_empty() {
                return Ok(());
            }
            for handle in pending {
                if let Err(err) = handle.await {
                    error!("Read task ended abnormally: {}", err);
                }
            }
        }
    }
}

/// Runtime of one resource configuration over a shared store
pub struct ResourceEngine<S> {
    context: Arc<ResourceContext<S>>,
}

impl<S> Clone for ResourceEngine<S> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<S> fmt::Debug for ResourceEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceEngine")
            .field("prefix", &self.context.prefix)
            .field("config", &self.context.config)
            .finish_non_exhaustive()
    }
}

impl<S: Send + Sync + 'static> ResourceEngine<S> {
    /// Create an engine under a fresh partition prefix
    pub fn new(config: ResourceConfig<S>, store: Store<S>) -> Result<Self> {
        Self::with_prefix(config, store, PathPrefix::generate())
    }

    /// Create an engine for an existing partition prefix.
    ///
    /// Initialization is idempotent, so engines sharing a prefix share the
    /// partition and its status lists.
    pub fn with_prefix(config: ResourceConfig<S>, store: Store<S>, prefix: PathPrefix) -> Result<Self> {
        config.validate()?;

        let init = Process::new("init", vec![initialize_resource]).bind(&store);
        init.execute(InitResourcePayload { path_prefix: prefix })?;
        debug!("Resource engine bound to partition {}", prefix);

        let executors = Executors::bind(&store);
        Ok(Self {
            context: Arc::new(ResourceContext {
                prefix,
                config,
                store,
                executors,
                pending: PendingReads::new(),
                in_flight: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Handle for one consumer. `invalidator` is called whenever a part of the
    /// store the consumer has read from changes.
    pub fn resource(&self, initiator: InitiatorId, invalidator: Option<Invalidator>) -> Resource<S> {
        Resource::new(Arc::clone(&self.context), initiator, invalidator)
    }

    pub fn path_prefix(&self) -> PathPrefix {
        self.context.prefix
    }

    pub fn store(&self) -> &Store<S> {
        &self.context.store
    }

    pub fn config(&self) -> &ResourceConfig<S> {
        &self.context.config
    }

    /// Wait until every read dispatched through this engine has finished,
    /// including reads started while waiting.
    pub async fn settle(&self) -> Result<()> {
        self.context.settle().await
    }
}
