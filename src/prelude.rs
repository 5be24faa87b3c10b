//! Recommended imports grouped by abstraction level.
//!
//! `app` covers what UI code needs to bind resources.
//! `advanced` exposes the store and pipeline internals.

pub mod app {
    //! Stable surface for binding resources to consumers.
    pub use crate::{
        DataMiddleware, GetOrReadOptions, ManyResourceResponse, PageRequest, Registry, Resource,
        ResourceConfig, ResourceEngine, ResourceError, RestResource, Result, StatusOptions, Store,
        create_data_middleware, provider,
    };
}

pub mod advanced {
    //! Escape hatch for partition state, patch operations and processes.
    pub use crate::commands;
    pub use crate::process::{Command, CommandOutput, CommandPayload, Execution, Process};
    pub use crate::store::{Location, Operation, Partition, StorePath, Subscription};
}
