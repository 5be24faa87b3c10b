// ============================================================================
// RustResources Library
// ============================================================================
//
// Resource data binding for UI consumers: a normalized, transactional entity
// store, a typed command pipeline with rollback, and per-consumer resource
// handles with pagination.
//
// ============================================================================

pub mod binding;
pub mod commands;
pub mod config;
pub mod core;
pub mod engine;
pub mod prelude;
pub mod process;
pub mod rest;
pub mod store;

// Re-export main types for convenience
pub use binding::{
    DataMiddleware, ProviderInstance, Registry, ResourceProvider, STATE_INJECTOR,
    create_data_middleware, provider,
};
pub use config::{ManyResourceResponse, ReadPagination, ReadRequest, ReadResponse, ResourceConfig};
pub use core::{
    Action, ActionType, InitiatorId, PathPrefix, ResourceError, Result, Status, StatusOptions,
};
pub use engine::{GetOrReadOptions, Invalidator, PageRequest, Pager, Resource, ResourceEngine};
pub use rest::{HttpVerb, RestOperationConfig, RestResource, RestTransport};
pub use store::Store;
