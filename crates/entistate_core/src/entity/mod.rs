//! Entity types.

mod id;
mod record;
mod traits;

pub use id::RecordId;
pub use record::Record;
pub use traits::{Entity, EntityHooks, EntityKey, DEFAULT_ID_KEY};
