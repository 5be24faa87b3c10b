use super::payloads::{FailedResourcePayload, InitResourcePayload, InvalidatePaginationPayload};
use crate::core::{ActionKey, Result, Status};
use crate::process::CommandOutput;
use crate::store::{Operation, Partition, StatusLists};

/// Seed `meta.actions` with empty `read/many` lists. No-op once initialized.
pub fn initialize_resource<S>(
    partition: &Partition<S>,
    _payload: &InitResourcePayload,
) -> Result<CommandOutput<S>> {
    if partition.meta.actions.is_some() {
        return Ok(CommandOutput::none());
    }
    let actions = im::ordmap! { ActionKey::READ_MANY => StatusLists::default() };
    Ok(vec![Operation::ReplaceActions(Some(actions))].into())
}

/// Forget which pages have been loaded, so every window is fetched again.
pub fn invalidate_pagination<S>(
    partition: &Partition<S>,
    _payload: &InvalidatePaginationPayload,
) -> Result<CommandOutput<S>> {
    if partition.meta.pagination.loaded_pages.is_empty() {
        return Ok(CommandOutput::none());
    }
    Ok(vec![Operation::ReplaceLoadedPages(im::Vector::new())].into())
}

pub fn failed_resource<S>(
    _partition: &Partition<S>,
    payload: &FailedResourcePayload,
) -> Result<CommandOutput<S>> {
    Ok(vec![Operation::SetStatus {
        key: ActionKey::new(payload.action, payload.kind),
        initiator: payload.initiator.clone(),
        status: Some(Status::Failed),
        index: None,
    }]
    .into())
}
