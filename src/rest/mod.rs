// ============================================================================
// REST Resource Configuration
// ============================================================================
//
// Builds a `ResourceConfig` whose read issues one HTTP request through a
// pluggable transport. Unreachable endpoints and non-ok replies become
// unsuccessful responses, never errors.
//
// ============================================================================

pub mod config;
pub mod transport;

pub use config::{RestOperationConfig, RestResource, RestUrlOptions, UrlFn};
pub use transport::{
    HttpVerb, JSON_CONTENT_TYPE, ReqwestTransport, RestReply, RestRequest, RestTransport,
};
