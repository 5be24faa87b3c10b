// ============================================================================
// Command Set
// ============================================================================
//
// Pure transitions over a partition. Each command only declares the
// operations it wants applied; the process pipeline applies them under the
// same lock the command read the partition with.
//
// ============================================================================

pub mod pagination;
pub mod payloads;
pub mod pending;
pub mod read;
pub mod resource;

pub use pagination::{
    clamp_offset, goto_page, last_page_offset, next_page, page_count, page_number, prev_page,
};
pub use payloads::{
    FailedResourcePayload, GotoPagePayload, InitResourcePayload, InvalidatePaginationPayload,
    PagePayload, PaginationPayload, ReadManyPayload,
};
pub use pending::{PendingGuard, PendingReads};
pub use read::{UNKNOWN_TOTAL, before_read_many, read_many};
pub use resource::{failed_resource, initialize_resource, invalidate_pagination};
