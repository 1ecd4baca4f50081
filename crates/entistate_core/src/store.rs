//! Observable value container.
//!
//! A [`Store`] holds an immutable snapshot of some state `S`. Writers
//! replace the snapshot through a pure reducer; readers either read the
//! current snapshot or register listeners that run after each write.
//!
//! # Usage
//!
//! ```rust,ignore
//! use entistate_core::{Store, TransactionCoordinator};
//!
//! let counter = Store::new("counter", 0u32, TransactionCoordinator::global());
//!
//! let _sub = counter.select(|n| *n % 2 == 0, |even| println!("even: {even}"));
//!
//! counter.set_value(|n| n + 1)?; // prints "even: false"
//! counter.set_value(|n| n + 2)?; // projection unchanged, nothing printed
//! ```
//!
//! While a transaction is open on the store's coordinator, notifications are
//! deferred and coalesced: listeners see the final snapshot once, after the
//! outermost transaction closes.

use crate::error::{StoreError, StoreResult};
use crate::stats::StoreStats;
use crate::transaction::TransactionCoordinator;
use crate::types::StoreId;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

type Callback<S> = Box<dyn Fn(&S) + Send + Sync>;

struct ListenerEntry<S> {
    id: u64,
    active: AtomicBool,
    callback: Callback<S>,
}

struct StoreInner<S> {
    id: StoreId,
    name: String,
    state: RwLock<Arc<S>>,
    listeners: Mutex<Vec<Arc<ListenerEntry<S>>>>,
    next_listener: AtomicU64,
    destroyed: AtomicBool,
    coordinator: Arc<TransactionCoordinator>,
    stats: Arc<StoreStats>,
}

impl<S> StoreInner<S> {
    fn notify(&self) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        let snapshot = self.state.read().clone();
        let listeners: Vec<_> = self.listeners.lock().iter().map(Arc::clone).collect();

        self.stats.record_notification();
        trace!(store = %self.name, listeners = listeners.len(), "notify");

        // Listeners run without any store lock held, so they may read or
        // write this store re-entrantly.
        for entry in listeners {
            if entry.active.load(Ordering::Acquire) {
                (entry.callback)(snapshot.as_ref());
            }
        }
    }
}

/// Removes a listener registration.
trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, listener: u64);
}

impl<S: Send + Sync> Unsubscribe for StoreInner<S> {
    fn unsubscribe(&self, listener: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(pos) = listeners.iter().position(|entry| entry.id == listener) {
            let entry = listeners.remove(pos);
            entry.active.store(false, Ordering::Release);
        }
    }
}

/// Handle to a registered listener.
///
/// The listener stays registered for as long as the handle lives; dropping
/// it unsubscribes. Use [`Subscription::detach`] to keep the listener for
/// the lifetime of the store.
#[must_use = "dropping a subscription unsubscribes the listener"]
pub struct Subscription {
    listener: u64,
    source: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    /// Unsubscribes the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keeps the listener registered until the store is destroyed.
    pub fn detach(mut self) {
        self.source = None;
    }

    /// Returns true if the store behind this subscription is gone.
    pub fn is_closed(&self) -> bool {
        self.source
            .as_ref()
            .map_or(true, |source| source.strong_count() == 0)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.take().and_then(|weak| weak.upgrade()) {
            source.unsubscribe(self.listener);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listener", &self.listener)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// An observable container of immutable state snapshots.
///
/// Cloning a `Store` yields another handle to the same container.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Creates a store holding `initial`.
    pub fn new(
        name: impl Into<String>,
        initial: S,
        coordinator: Arc<TransactionCoordinator>,
    ) -> Self {
        Self::with_stats(name, initial, coordinator, Arc::new(StoreStats::new()))
    }

    /// Creates a store that reports into shared `stats`.
    pub fn with_stats(
        name: impl Into<String>,
        initial: S,
        coordinator: Arc<TransactionCoordinator>,
        stats: Arc<StoreStats>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id: StoreId::next(),
                name: name.into(),
                state: RwLock::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                destroyed: AtomicBool::new(false),
                coordinator,
                stats,
            }),
        }
    }

    /// Returns the store ID.
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the coordinator this store batches with.
    pub fn coordinator(&self) -> &Arc<TransactionCoordinator> {
        &self.inner.coordinator
    }

    /// Returns the store statistics.
    pub fn stats(&self) -> &StoreStats {
        &self.inner.stats
    }

    /// Returns the current snapshot.
    ///
    /// After [`Store::destroy`] this is the last snapshot written.
    pub fn value(&self) -> Arc<S> {
        self.inner.state.read().clone()
    }

    /// Replaces the snapshot with `reducer(current)` and notifies listeners.
    ///
    /// Inside a transaction the notification is deferred until the
    /// outermost transaction closes.
    pub fn set_value(&self, reducer: impl FnOnce(&S) -> S) -> StoreResult<()> {
        self.ensure_alive()?;
        let current = self.value();
        let next = Arc::new(reducer(current.as_ref()));
        *self.inner.state.write() = next;
        self.dispatch();
        Ok(())
    }

    fn dispatch(&self) {
        let weak = Arc::downgrade(&self.inner);
        let deferred = self.inner.coordinator.schedule(
            self.inner.id,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.notify();
                }
            }),
        );
        if deferred {
            self.inner.stats.record_deferred();
        }
    }

    /// Registers a listener called with the snapshot after every
    /// notification.
    pub fn subscribe(&self, listener: impl Fn(&S) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(ListenerEntry {
            id,
            active: AtomicBool::new(true),
            callback: Box::new(listener),
        });
        if !self.is_destroyed() {
            self.inner.listeners.lock().push(entry);
        }
        let source: Weak<dyn Unsubscribe> = Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription {
            listener: id,
            source: Some(source),
        }
    }

    /// Observes a projection of the state.
    ///
    /// `listener` receives the current projection immediately, then every
    /// projection that differs from the last one it received.
    pub fn select<R, P, L>(&self, projector: P, listener: L) -> Subscription
    where
        R: PartialEq + Clone + Send + 'static,
        P: Fn(&S) -> R + Send + Sync + 'static,
        L: Fn(&R) + Send + Sync + 'static,
    {
        let initial = projector(self.value().as_ref());
        listener(&initial);
        self.watch(initial, projector, listener)
    }

    /// Observes changes of a projection, without the initial delivery.
    pub fn select_changes<R, P, L>(&self, projector: P, listener: L) -> Subscription
    where
        R: PartialEq + Clone + Send + 'static,
        P: Fn(&S) -> R + Send + Sync + 'static,
        L: Fn(&R) + Send + Sync + 'static,
    {
        let initial = projector(self.value().as_ref());
        self.watch(initial, projector, listener)
    }

    fn watch<R, P, L>(&self, initial: R, projector: P, listener: L) -> Subscription
    where
        R: PartialEq + Clone + Send + 'static,
        P: Fn(&S) -> R + Send + Sync + 'static,
        L: Fn(&R) + Send + Sync + 'static,
    {
        let last = Mutex::new(initial);
        self.subscribe(move |state| {
            let next = projector(state);
            {
                let mut last = last.lock();
                if *last == next {
                    return;
                }
                *last = next.clone();
            }
            listener(&next);
        })
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Returns true once the store has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Destroys the store.
    ///
    /// All listeners are released and further writes fail with
    /// [`StoreError::Destroyed`].
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let listeners = std::mem::take(&mut *self.inner.listeners.lock());
        for entry in listeners {
            entry.active.store(false, Ordering::Release);
        }
        trace!(store = %self.inner.name, "destroyed");
    }

    fn ensure_alive(&self) -> StoreResult<()> {
        if self.is_destroyed() {
            Err(StoreError::destroyed(self.inner.name.clone()))
        } else {
            Ok(())
        }
    }
}

impl<S> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("listeners", &self.inner.listeners.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> Store<u32> {
        Store::new("counter", 0, Arc::new(TransactionCoordinator::new()))
    }

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().push(value.clone()))
    }

    #[test]
    fn set_value_replaces_snapshot() {
        let store = counter();
        let before = store.value();

        store.set_value(|n| n + 5).unwrap();

        assert_eq!(*before, 0);
        assert_eq!(*store.value(), 5);
    }

    #[test]
    fn subscribe_receives_each_write() {
        let store = counter();
        let (seen, sink) = recorder::<u32>();
        let _sub = store.subscribe(sink);

        store.set_value(|n| n + 1).unwrap();
        store.set_value(|n| n + 1).unwrap();

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(store.stats().notifications(), 2);
    }

    #[test]
    fn select_emits_initial_and_distinct_values() {
        let store = counter();
        let (seen, sink) = recorder::<bool>();
        let _sub = store.select(|n| *n >= 2, sink);

        store.set_value(|n| n + 1).unwrap();
        store.set_value(|n| n + 1).unwrap();
        store.set_value(|n| n + 1).unwrap();

        assert_eq!(*seen.lock(), vec![false, true]);
    }

    #[test]
    fn select_changes_skips_initial() {
        let store = counter();
        let (seen, sink) = recorder::<u32>();
        let _sub = store.select_changes(|n| *n, sink);

        assert!(seen.lock().is_empty());
        store.set_value(|_| 3).unwrap();
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = counter();
        let (seen, sink) = recorder::<u32>();
        let sub = store.subscribe(sink);
        assert_eq!(store.listener_count(), 1);

        sub.unsubscribe();
        store.set_value(|n| n + 1).unwrap();

        assert_eq!(store.listener_count(), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn detached_subscription_keeps_listening() {
        let store = counter();
        let (seen, sink) = recorder::<u32>();
        store.subscribe(sink).detach();

        store.set_value(|n| n + 1).unwrap();
        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn transaction_coalesces_notifications() {
        let store = counter();
        let (seen, sink) = recorder::<u32>();
        let _sub = store.subscribe(sink);

        store.coordinator().run(|| {
            store.set_value(|n| n + 1).unwrap();
            store.set_value(|n| n + 1).unwrap();
            assert!(seen.lock().is_empty());
        });

        assert_eq!(*seen.lock(), vec![2]);
        assert_eq!(store.stats().deferred(), 2);
        assert_eq!(store.stats().notifications(), 1);
    }

    #[test]
    fn listener_may_write_reentrantly() {
        let store = counter();
        let writer = store.clone();
        let _sub = store.subscribe(move |n| {
            if *n == 1 {
                writer.set_value(|n| n + 10).unwrap();
            }
        });

        store.set_value(|n| n + 1).unwrap();
        assert_eq!(*store.value(), 11);
    }

    #[test]
    fn destroy_rejects_writes_and_drops_listeners() {
        let store = counter();
        let (seen, sink) = recorder::<u32>();
        let sub = store.subscribe(sink);

        store.destroy();

        assert!(store.is_destroyed());
        assert_eq!(store.listener_count(), 0);
        assert!(matches!(
            store.set_value(|n| n + 1),
            Err(StoreError::Destroyed { .. })
        ));
        assert!(seen.lock().is_empty());
        drop(sub);
    }

    #[test]
    fn subscription_reports_closed_store() {
        let store = counter();
        let sub = store.subscribe(|_| {});
        assert!(!sub.is_closed());
        drop(store);
        assert!(sub.is_closed());
    }
}
