// ============================================================================
// Normalized Entity Store
// ============================================================================
//
// Path-addressable, transactional container of resource partitions:
// - location: typed addresses inside a partition
// - operation: reversible patch operations (apply returns the inverse)
// - state: the typed partition tree
// - memory: the shared store handle with change subscriptions
//
// ============================================================================

pub mod location;
pub mod memory;
pub mod operation;
pub mod state;

pub use location::{Location, StorePath};
pub use memory::{ChangeCallback, Store, Subscription};
pub use operation::Operation;
pub use state::{
    ItemMeta, OrderBatch, PageSet, PaginationCursor, PaginationMeta, Partition, ResourceMeta,
    StatusLists,
};
