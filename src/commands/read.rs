use super::payloads::ReadManyPayload;
use crate::config::{ManyResourceResponse, ReadRequest, business_id};
use crate::core::{ResourceError, Result, Status, SyntheticId};
use crate::process::{CommandOutput, Continuation};
use crate::store::{ItemMeta, OrderBatch, Operation, PageSet, PaginationCursor, Partition, StatusLists};
use log::warn;
use std::sync::Arc;

/// Page-set total recorded when the backend does not report one
pub const UNKNOWN_TOTAL: u64 = 1_000_000_000;

/// Mark the initiator as loading and move its cursor to the requested window.
pub fn before_read_many<S: 'static>(
    partition: &Partition<S>,
    payload: &ReadManyPayload<S>,
) -> Result<CommandOutput<S>> {
    let mut operations = vec![Operation::SetStatus {
        key: payload.key(),
        initiator: payload.initiator.clone(),
        status: Some(Status::Loading),
        index: None,
    }];

    if let Some(window) = payload.pagination {
        let total = partition
            .cursor(&payload.initiator)
            .and_then(|cursor| cursor.total);
        operations.push(Operation::ReplaceCursor {
            initiator: payload.initiator.clone(),
            cursor: Some(PaginationCursor {
                offset: window.offset,
                size: window.size,
                start: window.start,
                total,
            }),
        });
    }

    Ok(operations.into())
}

/// Invoke the configured read. Normalization always happens in a deferred
/// step, against the partition as it is when the response arrives.
pub fn read_many<S: Send + Sync + 'static>(
    _partition: &Partition<S>,
    payload: &ReadManyPayload<S>,
) -> Result<CommandOutput<S>> {
    let request = ReadRequest {
        options: payload.options.clone(),
        pagination: payload.pagination.map(|window| window.read_pagination()),
    };
    let response = (payload.config.read)(request)?;
    let payload = payload.clone();

    Ok(CommandOutput::Deferred(Box::pin(async move {
        let response = response.resolve().await?;
        if !response.success {
            return Err(ResourceError::ReadFailed(format!(
                "read returned an unsuccessful response for {}",
                payload.initiator
            )));
        }
        let continuation: Continuation<S> =
            Box::new(move |partition| normalize(partition, &payload, response));
        Ok(continuation)
    })))
}

/// Operations storing a successful response. The initiator only leaves
/// `Loading` once none of its other reads is still in flight.
fn normalize<S>(
    partition: &Partition<S>,
    payload: &ReadManyPayload<S>,
    response: ManyResourceResponse,
) -> Result<Vec<Operation<S>>> {
    let others_pending = payload.pending.finish(&payload.initiator, payload.batch_id)?;
    let ManyResourceResponse { data: records, total, .. } = response;
    let mut batch = Vec::with_capacity(records.len());
    let mut operations = Vec::new();

    if !records.is_empty() {
        let mut data = partition.data.clone();
        let mut id_map = partition.id_map.clone();
        let mut items = partition.meta.items.clone();

        for record in records {
            let synthetic = SyntheticId::generate();
            match business_id(&record, &payload.config.id_key) {
                Some(id) => {
                    id_map.insert(id, synthetic);
                }
                None => warn!(
                    "Record without a usable '{}' field stored without an id mapping",
                    payload.config.id_key
                ),
            }
            data.insert(synthetic, Arc::new((payload.config.template)(record)));
            items.insert(
                synthetic,
                ItemMeta {
                    read: StatusLists::completed_by(&payload.initiator),
                },
            );
            batch.push(synthetic);
        }

        operations.push(Operation::ReplaceIdMap(id_map));
        operations.push(Operation::ReplaceData(data));
        operations.push(Operation::ReplaceItems(items));
    }

    if !others_pending {
        operations.push(Operation::SetStatus {
            key: payload.key(),
            initiator: payload.initiator.clone(),
            status: Some(Status::Completed),
            index: None,
        });
    }

    match payload.pagination {
        Some(window) => {
            let mut set: PageSet = partition
                .pagination
                .get(&window.size)
                .cloned()
                .unwrap_or_default();
            set.total = total.unwrap_or(UNKNOWN_TOTAL);
            set.pages.insert(window.offset, batch);
            operations.push(Operation::ReplacePageSet {
                size: window.size,
                set: Some(set),
            });

            let key = window.loaded_key();
            if !partition.is_page_loaded(key) {
                let mut loaded = partition.meta.pagination.loaded_pages.clone();
                loaded.push_back(key);
                operations.push(Operation::ReplaceLoadedPages(loaded));
            }

            // the cursor may have moved on while the read was in flight
            let cursor = partition
                .cursor(&payload.initiator)
                .map(|cursor| PaginationCursor { total, ..cursor })
                .unwrap_or(PaginationCursor {
                    offset: window.offset,
                    size: window.size,
                    start: window.start,
                    total,
                });
            operations.push(Operation::ReplaceCursor {
                initiator: payload.initiator.clone(),
                cursor: Some(cursor),
            });
        }
        None => operations.push(Operation::ReplaceOrder(im::vector![OrderBatch {
            batch: payload.batch_id,
            ids: batch,
        }])),
    }

    Ok(operations)
}
