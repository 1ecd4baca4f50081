//! Per-entity satellite reconciliation.
//!
//! An [`EntityCollectionPlugin`] keeps one satellite object per tracked
//! entity of an [`EntityStore`]. After [`EntityCollectionPlugin::attach`]
//! it follows the store's id list: satellites are created for ids that
//! appear and destroyed for ids that disappear.
//!
//! Within one reconciliation pass every creation (with its
//! [`SatelliteFactory::before_add`] and [`SatelliteFactory::after_add`]
//! callbacks) happens before any removal.

use entistate_core::{Entity, EntityStore, Subscription};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Which ids a plugin follows. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedIds<Id> {
    /// Every current and future id of the store.
    All,
    /// Only these ids, while they exist in the store.
    Subset(Vec<Id>),
}

/// An auxiliary object bound to one entity.
pub trait Satellite: Send + Sync + 'static {
    /// Releases the satellite's resources. Called once, before the
    /// satellite leaves the plugin.
    fn destroy(&self);
}

/// Creates satellites and observes their lifecycle.
pub trait SatelliteFactory<E: Entity>: Send + Sync + 'static {
    /// Satellite type produced by this factory.
    type Satellite: Satellite;

    /// Builds the satellite for `id`.
    fn instantiate(&self, id: &E::Id) -> Self::Satellite;

    /// Runs before a satellite for `id` is created.
    fn before_add(&self, id: &E::Id) {
        let _ = id;
    }

    /// Runs after a satellite was created and stored.
    fn after_add(&self, id: &E::Id, satellite: &Arc<Self::Satellite>) {
        let _ = (id, satellite);
    }

    /// Runs before a satellite is destroyed by reconciliation.
    fn before_remove(&self, id: &E::Id, satellite: &Arc<Self::Satellite>) {
        let _ = (id, satellite);
    }
}

type SatelliteMap<E, F> = HashMap<<E as Entity>::Id, Arc<<F as SatelliteFactory<E>>::Satellite>>;

struct PluginShared<E: Entity, F: SatelliteFactory<E>> {
    store: Arc<EntityStore<E>>,
    factory: F,
    tracked: TrackedIds<E::Id>,
    satellites: Mutex<SatelliteMap<E, F>>,
}

impl<E: Entity, F: SatelliteFactory<E>> PluginShared<E, F> {
    fn tracked_ids(&self) -> Vec<E::Id> {
        match &self.tracked {
            TrackedIds::All => self.store.ids(),
            TrackedIds::Subset(ids) => ids.clone(),
        }
    }

    fn has(&self, id: &E::Id) -> bool {
        self.satellites.lock().contains_key(id)
    }

    fn create(&self, id: &E::Id) {
        self.factory.before_add(id);
        let satellite = Arc::new(self.factory.instantiate(id));
        self.satellites
            .lock()
            .insert(id.clone(), Arc::clone(&satellite));
        self.factory.after_add(id, &satellite);
        debug!(store = %self.store.name(), id = ?id, "satellite created");
    }

    fn remove(&self, id: &E::Id) -> bool {
        let removed = self.satellites.lock().remove(id);
        match removed {
            Some(satellite) => {
                satellite.destroy();
                debug!(store = %self.store.name(), id = ?id, "satellite removed");
                true
            }
            None => false,
        }
    }

    fn activate(&self, ids: Option<&[E::Id]>) {
        let Some(ids) = ids else {
            let present = self.store.store().value();
            for id in self.tracked_ids() {
                if present.contains(&id) && !self.has(&id) {
                    self.create(&id);
                }
            }
            return;
        };

        let live: HashSet<&E::Id> = ids.iter().collect();
        let to_create: Vec<E::Id> = match &self.tracked {
            TrackedIds::All => ids.iter().filter(|id| !self.has(id)).cloned().collect(),
            TrackedIds::Subset(subset) => subset
                .iter()
                .filter(|id| live.contains(id) && !self.has(id))
                .cloned()
                .collect(),
        };
        for id in &to_create {
            self.create(id);
        }

        let to_remove: Vec<(E::Id, Arc<F::Satellite>)> = self
            .satellites
            .lock()
            .iter()
            .filter(|(id, _)| !live.contains(id))
            .map(|(id, satellite)| (id.clone(), Arc::clone(satellite)))
            .collect();
        for (id, satellite) in &to_remove {
            self.factory.before_remove(id, satellite);
            self.remove(id);
        }

        if !to_create.is_empty() || !to_remove.is_empty() {
            debug!(
                store = %self.store.name(),
                created = to_create.len(),
                removed = to_remove.len(),
                "satellites reconciled"
            );
        }
    }
}

/// Keeps satellites in step with a store's id list.
pub struct EntityCollectionPlugin<E: Entity, F: SatelliteFactory<E>> {
    shared: Arc<PluginShared<E, F>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<E: Entity, F: SatelliteFactory<E>> EntityCollectionPlugin<E, F> {
    /// Creates a detached plugin. Call [`Self::attach`] to start tracking.
    pub fn new(store: Arc<EntityStore<E>>, factory: F, tracked: TrackedIds<E::Id>) -> Self {
        Self {
            shared: Arc::new(PluginShared {
                store,
                factory,
                tracked,
                satellites: Mutex::new(HashMap::new()),
            }),
            subscription: Mutex::new(None),
        }
    }

    /// Seeds satellites and follows every later change of the id list.
    ///
    /// Attaching twice has no further effect.
    pub fn attach(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }
        self.shared.activate(None);
        let weak: Weak<PluginShared<E, F>> = Arc::downgrade(&self.shared);
        *subscription = Some(self.shared.store.store().select_changes(
            |state| state.ids.clone(),
            move |ids: &Vec<E::Id>| {
                if let Some(shared) = weak.upgrade() {
                    shared.activate(Some(ids));
                }
            },
        ));
    }

    /// Returns true while following the store.
    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Seeds (`None`) or reconciles against `ids`.
    pub fn activate(&self, ids: Option<&[E::Id]>) {
        self.shared.activate(ids);
    }

    /// Returns the observed store.
    pub fn store(&self) -> &Arc<EntityStore<E>> {
        &self.shared.store
    }

    /// Returns the satellite factory.
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }

    /// Returns the tracking mode.
    pub fn tracking(&self) -> &TrackedIds<E::Id> {
        &self.shared.tracked
    }

    /// Returns the ids this plugin follows: the store's ids in `All` mode,
    /// the fixed list otherwise.
    pub fn tracked_ids(&self) -> Vec<E::Id> {
        self.shared.tracked_ids()
    }

    /// Returns the satellite for `id`.
    pub fn get_entity(&self, id: &E::Id) -> Option<Arc<F::Satellite>> {
        self.shared.satellites.lock().get(id).cloned()
    }

    /// Returns true if a satellite exists for `id`.
    pub fn has_entity(&self, id: &E::Id) -> bool {
        self.shared.has(id)
    }

    /// Destroys and forgets the satellite for `id`.
    pub fn remove_entity(&self, id: &E::Id) -> bool {
        self.shared.remove(id)
    }

    /// Stores `satellite` for `id`, destroying any satellite it replaces.
    pub fn create_entity(&self, id: E::Id, satellite: F::Satellite) -> Arc<F::Satellite> {
        let satellite = Arc::new(satellite);
        let replaced = self
            .shared
            .satellites
            .lock()
            .insert(id, Arc::clone(&satellite));
        if let Some(old) = replaced {
            old.destroy();
        }
        satellite
    }

    /// Returns the satellites for `ids` (or the tracked ids), skipping ids
    /// without one.
    pub fn satellites(&self, ids: Option<&[E::Id]>) -> Vec<Arc<F::Satellite>> {
        let ids = match ids {
            Some(ids) => ids.to_vec(),
            None => self.tracked_ids(),
        };
        let satellites = self.shared.satellites.lock();
        ids.iter()
            .filter_map(|id| satellites.get(id).cloned())
            .collect()
    }

    /// Calls `f` with every existing satellite for `ids` (or the tracked
    /// ids).
    pub fn for_each_id(&self, ids: Option<&[E::Id]>, mut f: impl FnMut(&Arc<F::Satellite>)) {
        for satellite in self.satellites(ids) {
            f(&satellite);
        }
    }

    /// Returns the ids that currently have a satellite.
    pub fn satellite_ids(&self) -> Vec<E::Id> {
        self.shared.satellites.lock().keys().cloned().collect()
    }

    /// Returns the number of satellites.
    pub fn len(&self) -> usize {
        self.shared.satellites.lock().len()
    }

    /// Returns true if there are no satellites.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops following the store and destroys every satellite.
    pub fn destroy(&self) {
        self.subscription.lock().take();
        let satellites: Vec<_> = self.shared.satellites.lock().drain().collect();
        let count = satellites.len();
        for (_, satellite) in satellites {
            satellite.destroy();
        }
        debug!(store = %self.shared.store.name(), count, "plugin destroyed");
    }
}

impl<E: Entity, F: SatelliteFactory<E>> Drop for EntityCollectionPlugin<E, F> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<E: Entity, F: SatelliteFactory<E>> fmt::Debug for EntityCollectionPlugin<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCollectionPlugin")
            .field("store", &self.shared.store.name())
            .field("tracked", &self.shared.tracked)
            .field("satellites", &self.len())
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entistate_core::{Record, RecordId, StoreConfig, Target, TransactionCoordinator};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Probe {
        destroyed: AtomicBool,
    }

    impl Satellite for Probe {
        fn destroy(&self) {
            self.destroyed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct ProbeFactory {
        events: Mutex<Vec<String>>,
    }

    impl SatelliteFactory<Record> for ProbeFactory {
        type Satellite = Probe;

        fn instantiate(&self, _id: &RecordId) -> Probe {
            Probe {
                destroyed: AtomicBool::new(false),
            }
        }

        fn before_add(&self, id: &RecordId) {
            self.events.lock().push(format!("before_add {id}"));
        }

        fn after_add(&self, id: &RecordId, _satellite: &Arc<Probe>) {
            self.events.lock().push(format!("after_add {id}"));
        }

        fn before_remove(&self, id: &RecordId, _satellite: &Arc<Probe>) {
            self.events.lock().push(format!("before_remove {id}"));
        }
    }

    fn store() -> Arc<EntityStore<Record>> {
        Arc::new(EntityStore::new(
            StoreConfig::new().coordinator(Arc::new(TransactionCoordinator::new())),
        ))
    }

    fn rec(id: i64) -> Record {
        Record::try_from(json!({ "id": id })).unwrap()
    }

    fn sorted(mut ids: Vec<RecordId>) -> Vec<RecordId> {
        ids.sort_by_key(|id| id.to_string());
        ids
    }

    #[test]
    fn attach_seeds_existing_ids() {
        let store = store();
        store.set(vec![rec(1), rec(2)]).unwrap();
        let plugin = EntityCollectionPlugin::new(store, ProbeFactory::default(), TrackedIds::All);
        plugin.attach();
        assert_eq!(plugin.len(), 2);
        assert!(plugin.has_entity(&RecordId::from(1)));
    }

    #[test]
    fn follows_adds_and_removes() {
        let store = store();
        let plugin = EntityCollectionPlugin::new(
            Arc::clone(&store),
            ProbeFactory::default(),
            TrackedIds::All,
        );
        plugin.attach();

        store.add([rec(1), rec(2)]).unwrap();
        assert_eq!(plugin.len(), 2);

        let two = plugin.get_entity(&RecordId::from(2)).unwrap();
        store.remove(Target::id(2)).unwrap();
        assert_eq!(plugin.satellite_ids(), vec![RecordId::from(1)]);
        assert!(two.destroyed.load(Ordering::SeqCst));

        store.remove(Target::All).unwrap();
        assert!(plugin.is_empty());
    }

    #[test]
    fn creations_fire_before_removals() {
        let store = store();
        store.set(vec![rec(1)]).unwrap();
        let plugin = EntityCollectionPlugin::new(
            Arc::clone(&store),
            ProbeFactory::default(),
            TrackedIds::All,
        );
        plugin.attach();
        plugin.factory().events.lock().clear();

        store.set(vec![rec(2)]).unwrap();
        let events = plugin.factory().events.lock().clone();
        assert_eq!(events, vec!["before_add 2", "after_add 2", "before_remove 1"]);
    }

    #[test]
    fn subset_ignores_other_ids() {
        let store = store();
        let plugin = EntityCollectionPlugin::new(
            Arc::clone(&store),
            ProbeFactory::default(),
            TrackedIds::Subset(vec![RecordId::from(2), RecordId::from(3)]),
        );
        plugin.attach();
        assert!(plugin.is_empty());

        store.add([rec(1), rec(2)]).unwrap();
        assert_eq!(plugin.satellite_ids(), vec![RecordId::from(2)]);

        store.add([rec(3)]).unwrap();
        assert_eq!(
            sorted(plugin.satellite_ids()),
            vec![RecordId::from(2), RecordId::from(3)]
        );
        assert_eq!(
            plugin.tracked_ids(),
            vec![RecordId::from(2), RecordId::from(3)]
        );
    }

    #[test]
    fn for_each_id_skips_missing() {
        let store = store();
        store.set(vec![rec(1)]).unwrap();
        let plugin = EntityCollectionPlugin::new(store, ProbeFactory::default(), TrackedIds::All);
        plugin.attach();

        let mut visited = 0;
        plugin.for_each_id(Some(&[RecordId::from(1), RecordId::from(7)]), |_| visited += 1);
        assert_eq!(visited, 1);
    }

    #[test]
    fn manual_accessors() {
        let store = store();
        let plugin = EntityCollectionPlugin::new(store, ProbeFactory::default(), TrackedIds::All);
        let first = plugin.create_entity(
            RecordId::from(5),
            Probe {
                destroyed: AtomicBool::new(false),
            },
        );
        assert!(plugin.has_entity(&RecordId::from(5)));
        assert!(plugin.remove_entity(&RecordId::from(5)));
        assert!(first.destroyed.load(Ordering::SeqCst));
        assert!(!plugin.remove_entity(&RecordId::from(5)));
    }

    #[test]
    fn destroy_releases_everything() {
        let store = store();
        store.set(vec![rec(1), rec(2)]).unwrap();
        let plugin = EntityCollectionPlugin::new(
            Arc::clone(&store),
            ProbeFactory::default(),
            TrackedIds::All,
        );
        plugin.attach();
        let one = plugin.get_entity(&RecordId::from(1)).unwrap();

        plugin.destroy();
        assert!(plugin.is_empty());
        assert!(!plugin.is_attached());
        assert!(one.destroyed.load(Ordering::SeqCst));

        store.add([rec(3)]).unwrap();
        assert!(plugin.is_empty());
    }

    #[test]
    fn reconciles_once_per_transaction() {
        let store = store();
        let plugin = EntityCollectionPlugin::new(
            Arc::clone(&store),
            ProbeFactory::default(),
            TrackedIds::All,
        );
        plugin.attach();

        store
            .batch(|s| {
                s.add([rec(1)])?;
                s.add([rec(2)])?;
                s.remove(Target::id(1))
            })
            .unwrap();
        let events = plugin.factory().events.lock().clone();
        assert_eq!(events, vec!["before_add 2", "after_add 2"]);
        assert_eq!(plugin.satellite_ids(), vec![RecordId::from(2)]);
    }
}
