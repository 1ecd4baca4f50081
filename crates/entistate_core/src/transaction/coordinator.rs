//! Transaction coordinator.

use crate::types::{BatchId, StoreId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Deferred notification of one store.
pub(crate) type Flush = Box<dyn FnOnce() + Send>;

struct PendingFlush {
    store: StoreId,
    flush: Flush,
}

#[derive(Default)]
struct CoordinatorState {
    /// Number of open (nested) transactions.
    depth: usize,
    /// Batch opened by the outermost transaction.
    batch: Option<BatchId>,
    /// Stores waiting for the batch to close, ordered by last mutation.
    pending: Vec<PendingFlush>,
}

/// Tracks nested-transaction depth and releases deferred notifications.
///
/// Every store holding the same coordinator takes part in the same
/// transactions. [`TransactionCoordinator::global`] provides the
/// process-wide instance used by default; tests usually create their own.
///
/// ## Single-Threaded Use
///
/// The depth counter is shared by all participating stores. Transactions
/// opened concurrently from different threads would interleave into one
/// batch, so the coordinator assumes a single logical thread of mutation.
pub struct TransactionCoordinator {
    state: Mutex<CoordinatorState>,
    next_batch: AtomicU64,
    completed: AtomicU64,
}

static GLOBAL: OnceLock<Arc<TransactionCoordinator>> = OnceLock::new();

impl TransactionCoordinator {
    /// Creates a coordinator with no open transaction.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            next_batch: AtomicU64::new(1),
            completed: AtomicU64::new(0),
        }
    }

    /// Returns the process-wide coordinator.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns the current nesting depth.
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    /// Returns true while at least one transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.depth() > 0
    }

    /// Returns the batch of the open transaction, if any.
    pub fn current_batch(&self) -> Option<BatchId> {
        self.state.lock().batch
    }

    /// Returns the number of batches that have closed.
    pub fn completed_batches(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Opens a transaction.
    ///
    /// The outermost call opens a new batch; nested calls join it.
    pub fn enter(&self) -> BatchId {
        let mut state = self.state.lock();
        state.depth += 1;
        match state.batch {
            Some(batch) => batch,
            None => {
                let batch = BatchId::new(self.next_batch.fetch_add(1, Ordering::Relaxed));
                state.batch = Some(batch);
                debug!(%batch, "transaction batch opened");
                batch
            }
        }
    }

    /// Closes a transaction.
    ///
    /// When the outermost transaction closes, every deferred store flush
    /// runs once, outside the coordinator lock.
    pub fn leave(&self) {
        let (batch, pending) = {
            let mut state = self.state.lock();
            match state.depth {
                0 => {
                    warn!("leave called without an open transaction");
                    return;
                }
                1 => {
                    state.depth = 0;
                    (state.batch.take(), std::mem::take(&mut state.pending))
                }
                _ => {
                    state.depth -= 1;
                    return;
                }
            }
        };

        self.completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            batch = ?batch,
            stores = pending.len(),
            "transaction batch closed"
        );
        for entry in pending {
            (entry.flush)();
        }
    }

    /// Opens a transaction that closes when the guard drops.
    pub fn begin(&self) -> TransactionGuard<'_> {
        let batch = self.enter();
        TransactionGuard {
            coordinator: self,
            batch,
        }
    }

    /// Runs `action` inside a transaction.
    ///
    /// The transaction is closed even if `action` returns an error or
    /// unwinds; its result is returned unchanged.
    pub fn run<T>(&self, action: impl FnOnce() -> T) -> T {
        let _guard = self.begin();
        action()
    }

    /// Delivers a store notification now, or defers it to the end of the
    /// open batch.
    ///
    /// Returns true when the notification was deferred. A store deferred
    /// twice in one batch keeps a single flush, moved to the back of the
    /// queue.
    pub(crate) fn schedule(&self, store: StoreId, flush: Flush) -> bool {
        {
            let mut state = self.state.lock();
            if state.depth > 0 {
                state.pending.retain(|entry| entry.store != store);
                state.pending.push(PendingFlush { store, flush });
                return true;
            }
        }
        flush();
        false
    }

    /// Returns the number of stores waiting for the open batch to close.
    pub fn pending_stores(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionCoordinator")
            .field("depth", &state.depth)
            .field("batch", &state.batch)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// An open transaction scope.
///
/// Dropping the guard closes the transaction.
#[must_use = "the transaction closes as soon as the guard is dropped"]
pub struct TransactionGuard<'a> {
    coordinator: &'a TransactionCoordinator,
    batch: BatchId,
}

impl TransactionGuard<'_> {
    /// Returns the batch this transaction belongs to.
    pub fn batch(&self) -> BatchId {
        self.batch
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        self.coordinator.leave();
    }
}

impl fmt::Debug for TransactionGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionGuard")
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}
