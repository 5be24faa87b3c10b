// ============================================================================
// Typed Store Locations
// ============================================================================
//
// Enumerated addresses inside a partition. They replace string path segments
// while keeping the same tree: a change at `meta/pagination/current/{id}` is
// visible to subscribers of `meta/pagination` and of `meta`.
//
// ============================================================================

use crate::core::{ActionKey, InitiatorId, PathPrefix};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Data,
    IdMap,
    Order,
    Pagination,
    PageSet(u64),
    Meta,
    MetaItems,
    Actions,
    ActionStatus(ActionKey),
    PaginationMeta,
    Cursor(InitiatorId),
    LoadedPages,
}

impl Location {
    pub fn parent(&self) -> Option<Location> {
        match self {
            Location::Data
            | Location::IdMap
            | Location::Order
            | Location::Pagination
            | Location::Meta => None,
            Location::PageSet(_) => Some(Location::Pagination),
            Location::MetaItems | Location::Actions | Location::PaginationMeta => {
                Some(Location::Meta)
            }
            Location::ActionStatus(_) => Some(Location::Actions),
            Location::Cursor(_) | Location::LoadedPages => Some(Location::PaginationMeta),
        }
    }

    /// True when `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &Location) -> bool {
        let mut current = Some(other.clone());
        while let Some(location) = current {
            if &location == self {
                return true;
            }
            current = location.parent();
        }
        false
    }

    /// A change at either location is observable at the other.
    pub fn overlaps(&self, other: &Location) -> bool {
        self.contains(other) || other.contains(self)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Data => write!(f, "data"),
            Location::IdMap => write!(f, "idMap"),
            Location::Order => write!(f, "order"),
            Location::Pagination => write!(f, "pagination"),
            Location::PageSet(size) => write!(f, "pagination/size-{}", size),
            Location::Meta => write!(f, "meta"),
            Location::MetaItems => write!(f, "meta/items"),
            Location::Actions => write!(f, "meta/actions"),
            Location::ActionStatus(key) => write!(f, "meta/actions/{}", key),
            Location::PaginationMeta => write!(f, "meta/pagination"),
            Location::Cursor(initiator) => write!(f, "meta/pagination/current/{}", initiator),
            Location::LoadedPages => write!(f, "meta/pagination/loadedPages"),
        }
    }
}

/// A location qualified by its partition. `location: None` addresses the
/// whole partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    pub prefix: PathPrefix,
    pub location: Option<Location>,
}

impl StorePath {
    pub fn new(prefix: PathPrefix, location: Location) -> Self {
        Self {
            prefix,
            location: Some(location),
        }
    }

    pub fn partition(prefix: PathPrefix) -> Self {
        Self {
            prefix,
            location: None,
        }
    }

    /// Whether a change at `changed` inside `prefix` is observable here.
    pub fn observes(&self, prefix: &PathPrefix, changed: &Location) -> bool {
        if &self.prefix != prefix {
            return false;
        }
        match &self.location {
            None => true,
            Some(location) => location.overlaps(changed),
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "/{}/{}", self.prefix, location),
            None => write!(f, "/{}", self.prefix),
        }
    }
}
