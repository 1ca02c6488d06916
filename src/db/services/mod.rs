//! The `services` module provides the high-level API for working with the
//! registry store. It encapsulates all row access patterns, so the rest of
//! the application (command dispatcher, composition root, binaries) works
//! with domain models without touching the underlying maps.
//!
//! This module is organized into sub-modules, each responsible for one
//! domain area (devices, groups, statuses, access scope). All public
//! functions are re-exported here for convenient access under the
//! `crate::db::services::` path.

pub mod access_service;
pub mod device_service;
pub mod group_service;
pub mod status_service;

pub use access_service::*;
pub use device_service::*;
pub use group_service::*;
pub use status_service::*;
