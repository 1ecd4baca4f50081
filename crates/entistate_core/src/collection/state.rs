//! Normalized collection state.

use crate::config::ActiveMode;
use crate::entity::Entity;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// The currently selected entity or entities.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Active<Id> {
    /// Nothing selected.
    #[default]
    None,
    /// One selected id.
    Single(Id),
    /// An ordered set of selected ids.
    Many(Vec<Id>),
}

impl<Id: Clone + PartialEq> Active<Id> {
    /// Returns the empty selection for `mode`.
    pub fn cleared(mode: ActiveMode) -> Self {
        match mode {
            ActiveMode::Single => Self::None,
            ActiveMode::Multi => Self::Many(Vec::new()),
        }
    }

    /// Returns the selection holding only `id`, shaped for `mode`.
    pub fn single(mode: ActiveMode, id: Id) -> Self {
        match mode {
            ActiveMode::Single => Self::Single(id),
            ActiveMode::Multi => Self::Many(vec![id]),
        }
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Single(_) => false,
            Self::Many(ids) => ids.is_empty(),
        }
    }

    /// Returns true if `id` is selected.
    pub fn contains(&self, id: &Id) -> bool {
        match self {
            Self::None => false,
            Self::Single(current) => current == id,
            Self::Many(ids) => ids.contains(id),
        }
    }

    /// Returns the selected ids in order.
    pub fn ids(&self) -> Vec<Id> {
        match self {
            Self::None => Vec::new(),
            Self::Single(id) => vec![id.clone()],
            Self::Many(ids) => ids.clone(),
        }
    }

    /// Returns the id when exactly one is selected.
    pub fn as_single(&self) -> Option<&Id> {
        match self {
            Self::Single(id) => Some(id),
            Self::Many(ids) if ids.len() == 1 => ids.first(),
            _ => None,
        }
    }

    pub(crate) fn renamed(&self, from: &Id, to: &Id) -> Self {
        let swap = |id: &Id| if id == from { to.clone() } else { id.clone() };
        match self {
            Self::None => Self::None,
            Self::Single(id) => Self::Single(swap(id)),
            Self::Many(ids) => Self::Many(ids.iter().map(swap).collect()),
        }
    }
}

impl<Id: Clone + Eq + Hash> Active<Id> {
    pub(crate) fn without(&self, removed: &HashSet<&Id>, mode: ActiveMode) -> Self {
        match self {
            Self::None => Self::None,
            Self::Single(id) if removed.contains(id) => Self::cleared(mode),
            Self::Single(id) => Self::Single(id.clone()),
            Self::Many(ids) => Self::Many(
                ids.iter()
                    .filter(|id| !removed.contains(id))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Collection-level fields, updated independently of entity data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionMeta {
    /// In-flight flag set by callers.
    pub loading: bool,
    /// Last error reported by callers.
    pub error: Option<String>,
}

/// A normalized entity collection.
///
/// `ids` defines the iteration order; `entities` holds the records. Every
/// operation of [`EntityStore`](super::EntityStore) keeps
/// `ids.len() == entities.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState<E: Entity> {
    /// Ordered, unique ids.
    pub ids: Vec<E::Id>,
    /// Records by id.
    pub entities: HashMap<E::Id, E>,
    /// Current selection.
    pub active: Active<E::Id>,
    /// In-flight flag.
    pub loading: bool,
    /// Last reported error.
    pub error: Option<String>,
}

impl<E: Entity> EntityState<E> {
    /// Creates an empty collection whose selection is shaped for `mode`.
    pub fn empty(mode: ActiveMode) -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            active: Active::cleared(mode),
            loading: false,
            error: None,
        }
    }

    /// Returns the entity with `id`.
    pub fn entity(&self, id: &E::Id) -> Option<&E> {
        self.entities.get(id)
    }

    /// Returns true if an entity with `id` exists.
    pub fn contains(&self, id: &E::Id) -> bool {
        self.entities.contains_key(id)
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates entities in `ids` order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }

    /// Returns the selected entities that exist.
    pub fn active_entities(&self) -> Vec<&E> {
        match &self.active {
            Active::None => Vec::new(),
            Active::Single(id) => self.entities.get(id).into_iter().collect(),
            Active::Many(ids) => ids.iter().filter_map(|id| self.entities.get(id)).collect(),
        }
    }

    /// Returns the collection-level fields.
    pub fn meta(&self) -> CollectionMeta {
        CollectionMeta {
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}
