//! # EntiState Testkit
//!
//! Test utilities for EntiState.
//!
//! This crate provides:
//! - Fixtures: isolated collections and notification recorders
//! - Property-based test generators using proptest
//! - An integration harness that checks a collection and its plugins
//!   against a shadow model
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entistate_testkit::prelude::*;
//!
//! #[test]
//! fn with_collection() {
//!     let todos = TestCollection::new();
//!     let recorder = NotificationRecorder::attach(&todos);
//!     todos.add([record(1, "a")]).unwrap();
//!     assert_eq!(recorder.count(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
