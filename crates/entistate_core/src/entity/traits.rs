//! Entity and hook traits.

use std::fmt;
use std::hash::Hash;

/// Default name of the field holding an entity's identifier.
pub const DEFAULT_ID_KEY: &str = "id";

/// A value usable as an entity identifier.
pub trait EntityKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> EntityKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// A uniquely identified record stored in an entity collection.
///
/// The id key configured on the store is passed to every id read and write,
/// so dynamic records can honor it literally; typed entities with a fixed
/// id field are free to ignore it.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Debug, PartialEq)]
/// struct Todo { id: u64, title: String, done: bool }
///
/// #[derive(Clone, Debug, Default)]
/// struct TodoPatch { title: Option<String>, done: Option<bool> }
///
/// impl Entity for Todo {
///     type Id = u64;
///     type Patch = TodoPatch;
///
///     fn entity_id(&self, _: &str) -> Option<u64> { Some(self.id) }
///     fn set_entity_id(&mut self, id: &u64, _: &str) { self.id = *id; }
///     fn merge(&self, patch: &TodoPatch) -> Self { /* field-wise overlay */ }
///     fn from_patch(patch: &TodoPatch) -> Self { /* defaults + patch */ }
/// }
/// ```
pub trait Entity: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Identifier type.
    type Id: EntityKey;

    /// Partial update applied by `merge`.
    type Patch: Clone + Default + fmt::Debug + Send + Sync + 'static;

    /// Reads the identifier stored under `id_key`.
    fn entity_id(&self, id_key: &str) -> Option<Self::Id>;

    /// Writes `id` under `id_key`.
    fn set_entity_id(&mut self, id: &Self::Id, id_key: &str);

    /// Returns a copy of this entity with the patch fields applied.
    fn merge(&self, patch: &Self::Patch) -> Self;

    /// Builds a new entity from plain patch data.
    fn from_patch(patch: &Self::Patch) -> Self;

    /// Returns this entity with the fields of `incoming` laid over it.
    ///
    /// Used when a bulk upsert receives a full record for an existing id.
    /// The default replaces the entity wholesale.
    fn overlay(&self, incoming: &Self) -> Self {
        incoming.clone()
    }
}

/// Per-store hooks run on entities before they are stored.
///
/// Every method defaults to the identity transform. Stores without hooks
/// skip these calls entirely.
pub trait EntityHooks<E: Entity>: Send + Sync {
    /// Transforms an entity before it is added.
    fn pre_add(&self, entity: E) -> E {
        entity
    }

    /// Transforms the merged entity before an update is stored.
    fn pre_update(&self, previous: &E, next: E) -> E {
        let _ = previous;
        next
    }

    /// Transforms an incoming record before a bulk upsert reads its id.
    fn pre_check(&self, entity: E) -> E {
        entity
    }
}
