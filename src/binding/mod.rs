// ============================================================================
// Binding Surface
// ============================================================================
//
// Two ways for UI code to reach a resource engine:
// - provider: widget-style, resolves its store from the injector registry
// - middleware: owns its store and hands out one consumer per widget id
//
// ============================================================================

pub mod middleware;
pub mod provider;
pub mod registry;

pub use middleware::{DataMiddleware, create_data_middleware};
pub use provider::{ProviderInstance, ResourceProvider, provider};
pub use registry::{Registry, STATE_INJECTOR};
