// ============================================================================
// Process Pipeline
// ============================================================================
//
// A process is an ordered list of commands bound to a store. Ready commands
// are applied inline; the first deferred command suspends the process and the
// remainder runs as a task on the current tokio runtime.
//
// Each stage is computed and applied under one store write lock, so
// concurrent processes never commit against a stale partition.
//
// Every applied operation's inverse is kept. On failure the inverses are
// applied newest-first, restoring the partition to its state before the
// process started, and then the recovery hook runs.
//
// ============================================================================

use super::command::{Command, CommandOutput, CommandPayload, Continuation};
use crate::core::{ResourceError, Result};
use crate::store::{Operation, Store};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, event, info_span};

/// Invoked after rollback when a process fails with a non-fatal error
pub type RecoveryHook<S, P> = Arc<dyn Fn(&Store<S>, &P, &ResourceError) + Send + Sync>;

pub struct Process<S, P> {
    name: String,
    commands: Vec<Command<S, P>>,
    recovery: Option<RecoveryHook<S, P>>,
}

impl<S, P> Clone for Process<S, P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            commands: self.commands.clone(),
            recovery: self.recovery.clone(),
        }
    }
}

impl<S, P> fmt::Debug for Process<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .field("recovery", &self.recovery.is_some())
            .finish()
    }
}

impl<S, P> Process<S, P>
where
    S: Send + Sync + 'static,
    P: CommandPayload,
{
    pub fn new(name: impl Into<String>, commands: Vec<Command<S, P>>) -> Self {
        Self {
            name: name.into(),
            commands,
            recovery: None,
        }
    }

    pub fn with_recovery(mut self, hook: RecoveryHook<S, P>) -> Self {
        self.recovery = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind to a store, yielding a callable executor
    pub fn bind(&self, store: &Store<S>) -> ProcessExecutor<S, P> {
        ProcessExecutor {
            process: Arc::new(self.clone()),
            store: store.clone(),
        }
    }
}

/// Outcome of [`ProcessExecutor::execute`]
#[derive(Debug)]
pub enum Execution {
    /// Every command ran; nothing is left in flight
    Settled,
    /// A deferred command is in flight on the runtime
    Pending(JoinHandle<()>),
}

impl Execution {
    pub fn is_pending(&self) -> bool {
        matches!(self, Execution::Pending(_))
    }

    /// Wait for an in-flight remainder to finish
    pub async fn wait(self) {
        if let Execution::Pending(handle) = self {
            if let Err(err) = handle.await {
                event!(Level::ERROR, error = %err, "process task aborted");
            }
        }
    }
}

enum Progress<S> {
    Finished,
    Suspended {
        next: usize,
        future: BoxFuture<'static, Result<Continuation<S>>>,
    },
}

/// A process bound to a store
pub struct ProcessExecutor<S, P> {
    process: Arc<Process<S, P>>,
    store: Store<S>,
}

impl<S, P> Clone for ProcessExecutor<S, P> {
    fn clone(&self) -> Self {
        Self {
            process: Arc::clone(&self.process),
            store: self.store.clone(),
        }
    }
}

impl<S, P> ProcessExecutor<S, P>
where
    S: Send + Sync + 'static,
    P: CommandPayload,
{
    pub fn name(&self) -> &str {
        &self.process.name
    }

    /// Run the process for `payload`.
    ///
    /// Non-fatal failures are rolled back, handed to the recovery hook and
    /// reported as settled. Fatal failures are rolled back and returned.
    pub fn execute(&self, payload: P) -> Result<Execution> {
        let payload = Arc::new(payload);
        let span = info_span!("process", name = %self.process.name, prefix = %payload.path_prefix());
        let _entered = span.enter();

        let mut undo = Vec::new();
        match self.run_from(0, &payload, &mut undo) {
            Ok(Progress::Finished) => {
                event!(Level::DEBUG, "process settled");
                Ok(Execution::Settled)
            }
            Ok(Progress::Suspended { next, future }) => {
                let runtime = match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let error = ResourceError::Runtime(err.to_string());
                        self.fail(&payload, undo, &error);
                        return Err(error);
                    }
                };

                event!(Level::DEBUG, next, "process suspended");
                let executor = self.clone();
                let handle = runtime.spawn(
                    executor
                        .resume(next, future, payload, undo)
                        .instrument(span.clone()),
                );
                Ok(Execution::Pending(handle))
            }
            Err(error) => {
                self.fail(&payload, undo, &error);
                if error.is_fatal() {
                    Err(error)
                } else {
                    Ok(Execution::Settled)
                }
            }
        }
    }

    fn run_from(
        &self,
        start: usize,
        payload: &Arc<P>,
        undo: &mut Vec<Operation<S>>,
    ) -> Result<Progress<S>> {
        let prefix = payload.path_prefix();
        for (index, command) in self.process.commands.iter().enumerate().skip(start) {
            let (inverses, deferred) = self.store.update(&prefix, |partition| {
                match command(partition, payload)? {
                    CommandOutput::Ready(operations) => Ok((operations, None)),
                    CommandOutput::Deferred(future) => Ok((Vec::new(), Some(future))),
                }
            })?;
            undo.splice(0..0, inverses);

            if let Some(future) = deferred {
                return Ok(Progress::Suspended {
                    next: index + 1,
                    future,
                });
            }
        }
        Ok(Progress::Finished)
    }

    fn continue_with(
        &self,
        continuation: Continuation<S>,
        next: usize,
        payload: &Arc<P>,
        undo: &mut Vec<Operation<S>>,
    ) -> Result<Progress<S>> {
        let prefix = payload.path_prefix();
        let (inverses, ()) = self
            .store
            .update(&prefix, |partition| Ok((continuation(partition)?, ())))?;
        undo.splice(0..0, inverses);
        self.run_from(next, payload, undo)
    }

    async fn resume(
        self,
        mut next: usize,
        mut future: BoxFuture<'static, Result<Continuation<S>>>,
        payload: Arc<P>,
        mut undo: Vec<Operation<S>>,
    ) {
        loop {
            let progress = match future.await {
                Ok(continuation) => self.continue_with(continuation, next, &payload, &mut undo),
                Err(error) => Err(error),
            };

            match progress {
                Ok(Progress::Finished) => {
                    event!(Level::DEBUG, "process settled");
                    return;
                }
                Ok(Progress::Suspended {
                    next: resume_at,
                    future: pending,
                }) => {
                    next = resume_at;
                    future = pending;
                }
                Err(error) => {
                    if error.is_fatal() {
                        event!(Level::ERROR, error = %error, "deferred process step failed fatally");
                    }
                    self.fail(&payload, undo, &error);
                    return;
                }
            }
        }
    }

    fn fail(&self, payload: &Arc<P>, undo: Vec<Operation<S>>, error: &ResourceError) {
        let prefix = payload.path_prefix();
        let undone = undo.len();
        event!(Level::WARN, error = %error, undone, "process failed, rolling back");

        if let Err(rollback_error) = self.store.apply(&prefix, undo) {
            event!(Level::ERROR, error = %rollback_error, "rollback could not be applied");
        }

        if error.is_fatal() {
            return;
        }
        if let Some(hook) = &self.process.recovery {
            hook(&self.store, payload, error);
        }
    }
}
