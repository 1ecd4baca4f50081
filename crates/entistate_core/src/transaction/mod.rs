//! Transactional batching of store notifications.
//!
//! A transaction is a dynamic scope during which every store that is
//! mutated defers its notification. When the outermost transaction ends,
//! each affected store notifies exactly once with its latest state.
//!
//! - **Nesting**: inner transactions share the outer batch
//! - **Coalescing**: repeated mutations of one store produce one notification
//! - **Cleanup**: the depth counter is restored even when the action fails

mod coordinator;

pub use coordinator::{TransactionCoordinator, TransactionGuard};
