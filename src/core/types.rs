// ============================================================================
// Identifiers and Status Vocabulary
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of one UI consumer of a resource.
///
/// Loading/failed/completed membership and pagination cursors are scoped by
/// initiator, so several consumers of the same resource never interfere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InitiatorId(String);

impl InitiatorId {
    pub fn new(id: impl Into<String>) -> Self {
        InitiatorId(id.into())
    }

    /// Generate a fresh random initiator id
    pub fn generate() -> Self {
        InitiatorId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InitiatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InitiatorId {
    fn from(value: &str) -> Self {
        InitiatorId::new(value)
    }
}

impl From<String> for InitiatorId {
    fn from(value: String) -> Self {
        InitiatorId(value)
    }
}

/// Internally generated identifier of a normalized entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyntheticId(Uuid);

impl SyntheticId {
    pub fn generate() -> Self {
        SyntheticId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SyntheticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the set of entities fetched by one read invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn generate() -> Self {
        BatchId(Uuid::new_v4())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of one resource partition inside a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathPrefix(Uuid);

impl PathPrefix {
    pub fn generate() -> Self {
        PathPrefix(Uuid::new_v4())
    }
}

impl fmt::Display for PathPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Action {
    Read,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ActionType {
    Many,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::Many => write!(f, "many"),
        }
    }
}

/// Per-initiator status of an action
///
/// ```text
/// idle ──before_read_many──> Loading ──success──> Completed
///                               │
///                               └──failure──> Failed
/// ```
///
/// `Completed` and `Failed` are re-entered by later independent reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Loading,
    Failed,
    Completed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading => write!(f, "loading"),
            Status::Failed => write!(f, "failed"),
            Status::Completed => write!(f, "completed"),
        }
    }
}

/// An action + type pair, e.g. `read/many`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey {
    pub action: Action,
    pub kind: ActionType,
}

impl ActionKey {
    pub const READ_MANY: ActionKey = ActionKey {
        action: Action::Read,
        kind: ActionType::Many,
    };

    pub fn new(action: Action, kind: ActionType) -> Self {
        Self { action, kind }
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.action, self.kind)
    }
}

/// Narrows a status query to one action + type. Absent fields fall back to
/// `read` and `many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusOptions {
    pub action: Option<Action>,
    pub kind: Option<ActionType>,
}

impl StatusOptions {
    pub fn action(action: Action) -> Self {
        Self {
            action: Some(action),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ActionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn key(&self) -> ActionKey {
        ActionKey {
            action: self.action.unwrap_or(Action::Read),
            kind: self.kind.unwrap_or(ActionType::Many),
        }
    }
}

/// Cache key of one fetched page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadedPageKey {
    pub size: u64,
    pub offset: u64,
}

impl LoadedPageKey {
    pub fn new(size: u64, offset: u64) -> Self {
        Self { size, offset }
    }
}

impl fmt::Display for LoadedPageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "size-{}-offset-{}", self.size, self.offset)
    }
}
