//! Store statistics.
//!
//! Counters for mutations and notifications, useful to verify batching
//! behavior and to diagnose chatty observers.
//!
//! # Usage
//!
//! ```rust,ignore
//! let todos = EntityStore::<Record>::new(StoreConfig::new().name("todos"));
//! todos.add(record)?;
//!
//! let stats = todos.stats().snapshot();
//! println!("Adds: {}", stats.adds);
//! println!("Notifications: {}", stats.notifications);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Store statistics and metrics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct StoreStats {
    // Mutation counters
    /// Total number of `set` operations applied.
    sets: AtomicU64,
    /// Total number of `add` operations applied.
    adds: AtomicU64,
    /// Total number of entity `update` operations applied.
    updates: AtomicU64,
    /// Total number of `upsert`/`upsert_many` operations applied.
    upserts: AtomicU64,
    /// Total number of `remove` operations applied.
    removes: AtomicU64,
    /// Total number of changes to the active selection.
    active_changes: AtomicU64,

    // Notification counters
    /// Total number of notifications delivered to listeners.
    notifications: AtomicU64,
    /// Total number of notifications deferred to the end of a transaction.
    deferred: AtomicU64,

    /// Records skipped because they carried no id.
    skipped_records: AtomicU64,
}

impl StoreStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_add(&self) {
        self.adds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upsert(&self) {
        self.upserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_active_change(&self) {
        self.active_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self, count: u64) {
        self.skipped_records.fetch_add(count, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of `set` operations.
    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::Relaxed)
    }

    /// Returns the number of `add` operations.
    pub fn adds(&self) -> u64 {
        self.adds.load(Ordering::Relaxed)
    }

    /// Returns the number of entity updates.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Returns the number of upserts.
    pub fn upserts(&self) -> u64 {
        self.upserts.load(Ordering::Relaxed)
    }

    /// Returns the number of removals.
    pub fn removes(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }

    /// Returns the number of active selection changes.
    pub fn active_changes(&self) -> u64 {
        self.active_changes.load(Ordering::Relaxed)
    }

    /// Returns the number of notifications delivered.
    ///
    /// Mutations inside a transaction count once per store, not once per
    /// mutation.
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::Relaxed)
    }

    /// Returns the number of mutations whose notification was deferred.
    pub fn deferred(&self) -> u64 {
        self.deferred.load(Ordering::Relaxed)
    }

    /// Returns the number of records skipped for lacking an id.
    pub fn skipped_records(&self) -> u64 {
        self.skipped_records.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sets: self.sets(),
            adds: self.adds(),
            updates: self.updates(),
            upserts: self.upserts(),
            removes: self.removes(),
            active_changes: self.active_changes(),
            notifications: self.notifications(),
            deferred: self.deferred(),
            skipped_records: self.skipped_records(),
        }
    }
}

/// A point-in-time snapshot of store statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct StatsSnapshot {
    /// Number of `set` operations.
    pub sets: u64,
    /// Number of `add` operations.
    pub adds: u64,
    /// Number of entity updates.
    pub updates: u64,
    /// Number of upserts.
    pub upserts: u64,
    /// Number of removals.
    pub removes: u64,
    /// Number of active selection changes.
    pub active_changes: u64,
    /// Number of notifications delivered.
    pub notifications: u64,
    /// Number of deferred notifications.
    pub deferred: u64,
    /// Number of skipped records.
    pub skipped_records: u64,
}
