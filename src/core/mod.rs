pub mod error;
pub mod types;

pub use error::{ResourceError, Result};
pub use types::{
    Action, ActionKey, ActionType, BatchId, InitiatorId, LoadedPageKey, PathPrefix, Status,
    StatusOptions, SyntheticId,
};
