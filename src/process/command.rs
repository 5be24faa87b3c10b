use crate::core::{PathPrefix, Result};
use crate::store::{Operation, Partition};
use futures::future::BoxFuture;

/// Computes the operations of a deferred step against the partition as it is
/// when the step resumes.
pub type Continuation<S> = Box<dyn FnOnce(&Partition<S>) -> Result<Vec<Operation<S>>> + Send>;

/// What a command asks the pipeline to do
pub enum CommandOutput<S> {
    /// Apply these operations now
    Ready(Vec<Operation<S>>),
    /// Suspend until the future resolves, then apply the continuation
    Deferred(BoxFuture<'static, Result<Continuation<S>>>),
}

impl<S> CommandOutput<S> {
    pub fn none() -> Self {
        CommandOutput::Ready(Vec::new())
    }
}

impl<S> From<Vec<Operation<S>>> for CommandOutput<S> {
    fn from(operations: Vec<Operation<S>>) -> Self {
        CommandOutput::Ready(operations)
    }
}

/// A pure transition: reads the partition and a payload, declares intended
/// mutations. Runs under the store's write lock.
pub type Command<S, P> = fn(&Partition<S>, &P) -> Result<CommandOutput<S>>;

/// Payloads name the partition their commands run against.
pub trait CommandPayload: Send + Sync + 'static {
    fn path_prefix(&self) -> PathPrefix;
}
