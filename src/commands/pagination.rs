use super::payloads::{GotoPagePayload, PagePayload};
use crate::core::{InitiatorId, Result};
use crate::process::CommandOutput;
use crate::store::{Operation, PaginationCursor, Partition};
use log::debug;

/// Offset of the last page: `total - (total % size || size)`.
///
/// A zero size has no pages, so its bound is 0.
pub fn last_page_offset(total: u64, size: u64) -> u64 {
    if size == 0 {
        return 0;
    }
    match total % size {
        0 => total.saturating_sub(size),
        remainder => total - remainder,
    }
}

/// Keep `offset` inside `[0, last_page_offset]`. An unknown total has no
/// upper bound.
pub fn clamp_offset(offset: u64, size: u64, total: Option<u64>) -> u64 {
    match total {
        Some(total) => offset.min(last_page_offset(total, size)),
        None => offset,
    }
}

/// 1-based page number containing `offset`
pub fn page_number(offset: u64, size: u64) -> u64 {
    if size == 0 {
        return 1;
    }
    offset.div_ceil(size) + 1
}

/// Number of pages for `total` items, if the size allows any
pub fn page_count(total: u64, size: u64) -> Option<u64> {
    if size == 0 {
        return None;
    }
    Some(total.div_ceil(size))
}

pub fn next_page<S>(partition: &Partition<S>, payload: &PagePayload) -> Result<CommandOutput<S>> {
    Ok(move_cursor(partition, &payload.initiator, |cursor| {
        cursor.offset.saturating_add(cursor.size)
    }))
}

pub fn prev_page<S>(partition: &Partition<S>, payload: &PagePayload) -> Result<CommandOutput<S>> {
    Ok(move_cursor(partition, &payload.initiator, |cursor| {
        cursor.offset.saturating_sub(cursor.size)
    }))
}

/// Jump to 1-based `page`
pub fn goto_page<S>(partition: &Partition<S>, payload: &GotoPagePayload) -> Result<CommandOutput<S>> {
    let page = payload.page;
    Ok(move_cursor(partition, &payload.initiator, |cursor| {
        page.saturating_sub(1).saturating_mul(cursor.size)
    }))
}

fn move_cursor<S>(
    partition: &Partition<S>,
    initiator: &InitiatorId,
    target: impl FnOnce(&PaginationCursor) -> u64,
) -> CommandOutput<S> {
    let Some(cursor) = partition.cursor(initiator) else {
        debug!("No pagination cursor for {}, ignoring page move", initiator);
        return CommandOutput::none();
    };

    let offset = clamp_offset(target(&cursor), cursor.size, cursor.total);
    if offset == cursor.offset {
        return CommandOutput::none();
    }

    vec![Operation::ReplaceCursor {
        initiator: initiator.clone(),
        cursor: Some(PaginationCursor {
            offset,
            start: page_number(offset, cursor.size),
            ..cursor
        }),
    }]
    .into()
}
