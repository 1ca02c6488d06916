//! The registry store holds the shared mutable rows (devices, groups,
//! memberships, statuses, users, access grants) behind concurrent keyed
//! maps. It stands in for the external relational store and provides the
//! one guarantee the services rely on: every read-modify-write of a row
//! goes through a single keyed entry guard, so updates to the same key are
//! atomic relative to each other. There is no table-level locking and no
//! cross-row transaction; operations that need a predicate and a mutation
//! to be indivisible (scoped membership removal) perform both under the
//! same entry guard.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI32, Ordering};

use chrono::Utc;
use dashmap::DashMap;

use crate::db::models::{Device, DeviceStatus, Group, User};

/// Current wall-clock time as epoch milliseconds, the unit the registry
/// stores for `enroll_time`/`last_update`.
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Default)]
pub struct RegistryStore {
    pub(crate) devices: DashMap<i32, Device>,
    pub(crate) groups: DashMap<i32, Group>,
    /// Membership rows, keyed by device id. The entry guard on a device's
    /// set is the atomicity unit for membership changes.
    pub(crate) device_groups: DashMap<i32, HashSet<i32>>,
    pub(crate) device_statuses: DashMap<i32, DeviceStatus>,
    /// Explicit access grants, keyed by user id. Consulted only for users
    /// without the blanket `all_devices_available` flag.
    pub(crate) access_grants: DashMap<i32, HashSet<i32>>,
    pub(crate) users: DashMap<i32, User>,
    next_device_id: AtomicI32,
    next_group_id: AtomicI32,
    next_user_id: AtomicI32,
}

impl RegistryStore {
    pub fn new() -> Self {
        RegistryStore {
            next_device_id: AtomicI32::new(1),
            next_group_id: AtomicI32::new(1),
            next_user_id: AtomicI32::new(1),
            ..Default::default()
        }
    }

    pub(crate) fn next_device_id(&self) -> i32 {
        self.next_device_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_group_id(&self) -> i32 {
        self.next_group_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_user_id(&self) -> i32 {
        self.next_user_id.fetch_add(1, Ordering::Relaxed)
    }
}
