use std::collections::HashSet;

use crate::db::models::{Device, User};
use crate::db::store::RegistryStore;
use crate::error::AppError;

// --- Access Scope Functions ---

/// Creates a user. Users with `all_devices_available` get a blanket view of
/// their tenant; everyone else sees only explicitly granted groups.
pub fn create_user(
    store: &RegistryStore,
    username: &str,
    customer_id: i32,
    all_devices_available: bool,
) -> User {
    let id = store.next_user_id();
    let user = User {
        id,
        username: username.to_owned(),
        customer_id,
        all_devices_available,
    };
    store.users.insert(id, user.clone());
    user
}

/// Grants a user access to a group. No-op if the grant already exists.
pub fn grant_group_access(store: &RegistryStore, user_id: i32, group_id: i32) -> Result<(), AppError> {
    if !store.users.contains_key(&user_id) {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }
    if !store.groups.contains_key(&group_id) {
        return Err(AppError::NotFound(format!("group {group_id}")));
    }
    store.access_grants.entry(user_id).or_default().insert(group_id);
    Ok(())
}

/// Revokes a user's access to a group.
pub fn revoke_group_access(store: &RegistryStore, user_id: i32, group_id: i32) {
    if let Some(mut grants) = store.access_grants.get_mut(&user_id) {
        grants.remove(&group_id);
    }
}

fn get_user(store: &RegistryStore, user_id: i32) -> Result<User, AppError> {
    store
        .users
        .get(&user_id)
        .map(|u| u.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
}

/// The set of group ids the user may see within the tenant: every group of
/// the tenant for blanket users, otherwise exactly the granted ones.
pub fn visible_groups(
    store: &RegistryStore,
    user_id: i32,
    customer_id: i32,
) -> Result<HashSet<i32>, AppError> {
    let user = get_user(store, user_id)?;

    if user.all_devices_available && user.customer_id == customer_id {
        return Ok(store
            .groups
            .iter()
            .filter(|g| g.customer_id == customer_id)
            .map(|g| g.id)
            .collect());
    }

    let granted = store
        .access_grants
        .get(&user_id)
        .map(|g| g.value().clone())
        .unwrap_or_default();

    // Grants may reference groups of other tenants or deleted groups;
    // only tenant-local live groups count.
    Ok(granted
        .into_iter()
        .filter(|gid| {
            store
                .groups
                .get(gid)
                .is_some_and(|g| g.customer_id == customer_id)
        })
        .collect())
}

/// Restricts `devices` to those the user may see. Blanket users see every
/// device of the tenant; scoped users need at least one membership in a
/// visible group.
pub fn filter_devices(
    store: &RegistryStore,
    user_id: i32,
    customer_id: i32,
    devices: Vec<Device>,
) -> Result<Vec<Device>, AppError> {
    let user = get_user(store, user_id)?;

    if user.all_devices_available && user.customer_id == customer_id {
        return Ok(devices
            .into_iter()
            .filter(|d| d.customer_id == customer_id)
            .collect());
    }

    let visible = visible_groups(store, user_id, customer_id)?;
    Ok(devices
        .into_iter()
        .filter(|d| {
            d.customer_id == customer_id
                && store
                    .device_groups
                    .get(&d.id)
                    .is_some_and(|groups| !groups.is_disjoint(&visible))
        })
        .collect())
}

/// Fails with PermissionDenied unless the group is inside the caller's
/// visible scope. Checked before any group-mutating operation.
pub fn authorize_group_mutation(
    store: &RegistryStore,
    user_id: i32,
    customer_id: i32,
    group_id: i32,
) -> Result<(), AppError> {
    let visible = visible_groups(store, user_id, customer_id)?;
    if visible.contains(&group_id) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!(
            "user {user_id} may not modify group {group_id}"
        )))
    }
}
