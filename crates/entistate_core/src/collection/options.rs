//! Operation inputs and options.

use super::state::Active;
use crate::entity::Entity;
use std::collections::HashMap;
use std::fmt;

/// Predicate over entities.
pub type EntityPredicate<E> = Box<dyn Fn(&E) -> bool>;

/// Selects the entities an operation applies to.
pub enum Target<E: Entity> {
    /// Every entity currently in the collection.
    All,
    /// One id.
    Id(E::Id),
    /// Several ids.
    Ids(Vec<E::Id>),
    /// Every entity for which the predicate holds.
    Predicate(EntityPredicate<E>),
}

impl<E: Entity> Target<E> {
    /// Targets every entity.
    pub fn all() -> Self {
        Self::All
    }

    /// Targets one id.
    pub fn id(id: impl Into<E::Id>) -> Self {
        Self::Id(id.into())
    }

    /// Targets several ids.
    pub fn ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<E::Id>,
    {
        Self::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// Targets entities matching `predicate`.
    pub fn matching(predicate: impl Fn(&E) -> bool + 'static) -> Self {
        Self::Predicate(Box::new(predicate))
    }
}

impl<E: Entity> fmt::Debug for Target<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Self::Ids(ids) => f.debug_tuple("Ids").field(ids).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// How an update computes the next entity.
pub enum Patch<E: Entity> {
    /// Merge fixed fields onto each entity.
    Merge(E::Patch),
    /// Compute the fields to merge from the previous entity.
    With(Box<dyn Fn(&E) -> E::Patch>),
}

impl<E: Entity> Patch<E> {
    /// Merges fixed fields.
    pub fn merge(patch: impl Into<E::Patch>) -> Self {
        Self::Merge(patch.into())
    }

    /// Computes fields from the previous entity.
    pub fn with(f: impl Fn(&E) -> E::Patch + 'static) -> Self {
        Self::With(Box::new(f))
    }

    /// Returns the fields to merge onto `previous`.
    pub fn resolve(&self, previous: &E) -> E::Patch {
        match self {
            Self::Merge(patch) => patch.clone(),
            Self::With(f) => f(previous),
        }
    }

    /// Returns the fields for an entity that does not exist yet.
    ///
    /// Computed patches see an entity built from empty patch data.
    pub fn resolve_new(&self) -> E::Patch {
        match self {
            Self::Merge(patch) => patch.clone(),
            Self::With(f) => f(&E::from_patch(&E::Patch::default())),
        }
    }

    /// Returns `previous` with the patch applied.
    pub fn apply(&self, previous: &E) -> E {
        previous.merge(&self.resolve(previous))
    }
}

impl<E: Entity> fmt::Debug for Patch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge(patch) => f.debug_tuple("Merge").field(patch).finish(),
            Self::With(_) => write!(f, "With(..)"),
        }
    }
}

/// Input of `set`.
pub enum SetSource<E: Entity> {
    /// Full entities; ids are read through the id key, order preserved.
    List(Vec<E>),
    /// Entities keyed by id, in the given key order.
    Keyed(Vec<(E::Id, E)>),
    /// An already-normalized pair. Ids without an entity are dropped.
    Normalized {
        /// Ordered ids.
        ids: Vec<E::Id>,
        /// Records by id.
        entities: HashMap<E::Id, E>,
    },
}

impl<E: Entity> From<Vec<E>> for SetSource<E> {
    fn from(entities: Vec<E>) -> Self {
        Self::List(entities)
    }
}

impl<E: Entity> fmt::Debug for SetSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(list) => f.debug_tuple("List").field(&list.len()).finish(),
            Self::Keyed(keyed) => f.debug_tuple("Keyed").field(&keyed.len()).finish(),
            Self::Normalized { ids, .. } => {
                f.debug_struct("Normalized").field("ids", ids).finish_non_exhaustive()
            }
        }
    }
}

/// Options of `set`.
#[derive(Debug, Clone)]
pub struct SetOptions<Id> {
    /// Selection to install alongside the new entities.
    pub active: Option<Active<Id>>,
}

impl<Id> Default for SetOptions<Id> {
    fn default() -> Self {
        Self { active: None }
    }
}

/// Options of `add`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Insert new ids at the head instead of the tail.
    pub prepend: bool,
    /// Value of the loading flag after the add.
    pub loading: bool,
}

impl AddOptions {
    /// Options that prepend new ids.
    #[must_use]
    pub const fn prepend() -> Self {
        Self {
            prepend: true,
            loading: false,
        }
    }
}

/// Builds a new entity from an id and the patch fields.
pub type Factory<E> = Box<dyn Fn(&<E as Entity>::Id, &<E as Entity>::Patch) -> E>;

/// Options of `upsert`.
pub struct UpsertOptions<E: Entity> {
    /// Constructor for entities that do not exist yet. The id is written
    /// under the id key afterwards.
    pub factory: Option<Factory<E>>,
}

impl<E: Entity> Default for UpsertOptions<E> {
    fn default() -> Self {
        Self { factory: None }
    }
}

impl<E: Entity> UpsertOptions<E> {
    /// Options using `factory` for new entities.
    pub fn with_factory(factory: impl Fn(&E::Id, &E::Patch) -> E + 'static) -> Self {
        Self {
            factory: Some(Box::new(factory)),
        }
    }
}

/// Options of `upsert_many`.
pub struct UpsertManyOptions<E: Entity> {
    /// Value of the loading flag after the upsert.
    pub loading: bool,
    /// Constructor applied to every stored record, new or merged.
    pub factory: Option<Box<dyn Fn(E) -> E>>,
}

impl<E: Entity> Default for UpsertManyOptions<E> {
    fn default() -> Self {
        Self {
            loading: false,
            factory: None,
        }
    }
}

/// Requested change of the active selection.
pub enum ActiveTarget<E: Entity> {
    /// Select one id.
    Id(E::Id),
    /// Select several ids, duplicates dropped.
    Ids(Vec<E::Id>),
    /// Select the id before the current one in `ids` order.
    Prev {
        /// Wrap from the first id to the last.
        wrap: bool,
    },
    /// Select the id after the current one in `ids` order.
    Next {
        /// Wrap from the last id to the first.
        wrap: bool,
    },
    /// Select `id` if unselected, otherwise deselect it.
    Toggle(E::Id),
    /// Select the first entity in `ids` order matching the predicate.
    Filter(EntityPredicate<E>),
    /// Clear the selection.
    Clear,
}

impl<E: Entity> ActiveTarget<E> {
    /// Selects one id.
    pub fn id(id: impl Into<E::Id>) -> Self {
        Self::Id(id.into())
    }

    /// Selects the previous id, wrapping around.
    pub fn prev() -> Self {
        Self::Prev { wrap: true }
    }

    /// Selects the next id, wrapping around.
    pub fn next() -> Self {
        Self::Next { wrap: true }
    }

    /// Selects the first match of `predicate`.
    pub fn filter(predicate: impl Fn(&E) -> bool + 'static) -> Self {
        Self::Filter(Box::new(predicate))
    }
}

impl<E: Entity> fmt::Debug for ActiveTarget<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Self::Ids(ids) => f.debug_tuple("Ids").field(ids).finish(),
            Self::Prev { wrap } => f.debug_struct("Prev").field("wrap", wrap).finish(),
            Self::Next { wrap } => f.debug_struct("Next").field("wrap", wrap).finish(),
            Self::Toggle(id) => f.debug_tuple("Toggle").field(id).finish(),
            Self::Filter(_) => write!(f, "Filter(..)"),
            Self::Clear => write!(f, "Clear"),
        }
    }
}
