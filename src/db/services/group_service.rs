use tracing::info;

use crate::db::models::Group;
use crate::db::store::RegistryStore;
use crate::error::AppError;

// --- Group Store Functions ---

fn name_taken(store: &RegistryStore, customer_id: i32, name: &str, exclude_id: Option<i32>) -> bool {
    store.groups.iter().any(|g| {
        g.customer_id == customer_id && g.name == name && Some(g.id) != exclude_id
    })
}

/// Creates a group. Fails with Conflict when the name is already taken
/// within the tenant. New groups start unbilled (`credit = None`).
pub fn create_group(store: &RegistryStore, customer_id: i32, name: &str) -> Result<Group, AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("group name is required".to_owned()));
    }
    if name_taken(store, customer_id, name, None) {
        return Err(AppError::Conflict(format!("group name already exists: {name}")));
    }

    let id = store.next_group_id();
    let group = Group {
        id,
        customer_id,
        name: name.to_owned(),
        credit: None,
    };
    store.groups.insert(id, group.clone());
    info!(group_id = id, name, customer_id, "group created");
    Ok(group)
}

pub fn get_group_by_id(store: &RegistryStore, group_id: i32) -> Option<Group> {
    store.groups.get(&group_id).map(|g| g.value().clone())
}

pub fn get_group_by_name(store: &RegistryStore, customer_id: i32, name: &str) -> Option<Group> {
    store
        .groups
        .iter()
        .find(|g| g.customer_id == customer_id && g.name == name)
        .map(|g| g.value().clone())
}

pub fn get_all_groups(store: &RegistryStore, customer_id: i32) -> Vec<Group> {
    let mut groups: Vec<Group> = store
        .groups
        .iter()
        .filter(|g| g.customer_id == customer_id)
        .map(|g| g.value().clone())
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    groups
}

/// Renames a group, keeping the per-tenant name uniqueness rule.
pub fn rename_group(store: &RegistryStore, group_id: i32, name: &str) -> Result<(), AppError> {
    let customer_id = store
        .groups
        .get(&group_id)
        .map(|g| g.customer_id)
        .ok_or_else(|| AppError::NotFound(format!("group {group_id}")))?;
    if name_taken(store, customer_id, name, Some(group_id)) {
        return Err(AppError::Conflict(format!("group name already exists: {name}")));
    }
    if let Some(mut group) = store.groups.get_mut(&group_id) {
        group.name = name.to_owned();
    }
    Ok(())
}

/// Sets or clears a group's credit. `None` marks the group as not billed.
pub fn update_group_credit(
    store: &RegistryStore,
    group_id: i32,
    credit: Option<i32>,
) -> Result<(), AppError> {
    let mut group = store
        .groups
        .get_mut(&group_id)
        .ok_or_else(|| AppError::NotFound(format!("group {group_id}")))?;
    group.credit = credit;
    Ok(())
}

/// Sums credit over the tenant's groups, or over the given subset.
/// Unbilled groups (`credit = None`) are excluded from the sum, not
/// counted as zero.
pub fn total_credit(store: &RegistryStore, customer_id: i32, group_ids: Option<&[i32]>) -> i64 {
    store
        .groups
        .iter()
        .filter(|g| g.customer_id == customer_id)
        .filter(|g| group_ids.is_none_or(|ids| ids.contains(&g.id)))
        .filter_map(|g| g.credit)
        .map(i64::from)
        .sum()
}

/// Number of current device memberships in the group. Callers use this to
/// gate deletion; the check itself is not enforced here.
pub fn device_count(store: &RegistryStore, group_id: i32) -> i64 {
    store
        .device_groups
        .iter()
        .filter(|memberships| memberships.contains(&group_id))
        .count() as i64
}

/// Deletes a group and cascades its membership edges and access grants.
pub fn remove_group(store: &RegistryStore, group_id: i32) -> Result<(), AppError> {
    if store.groups.remove(&group_id).is_none() {
        return Err(AppError::NotFound(format!("group {group_id}")));
    }
    for mut memberships in store.device_groups.iter_mut() {
        memberships.remove(&group_id);
    }
    for mut grants in store.access_grants.iter_mut() {
        grants.remove(&group_id);
    }
    info!(group_id, "group removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewDevice;
    use crate::db::services::{register_device, set_device_groups};

    #[test]
    fn duplicate_group_name_within_tenant_conflicts() {
        let store = RegistryStore::new();
        create_group(&store, 1, "Sales").unwrap();
        let dup = create_group(&store, 1, "Sales");
        assert!(matches!(dup, Err(AppError::Conflict(_))));
        // Same name in another tenant is allowed.
        assert!(create_group(&store, 2, "Sales").is_ok());
    }

    #[test]
    fn rename_keeps_uniqueness_rule() {
        let store = RegistryStore::new();
        let sales = create_group(&store, 1, "Sales").unwrap();
        create_group(&store, 1, "Ops").unwrap();

        assert!(matches!(
            rename_group(&store, sales.id, "Ops"),
            Err(AppError::Conflict(_))
        ));
        // Renaming to its own current name is a no-op, not a conflict.
        rename_group(&store, sales.id, "Sales").unwrap();
        rename_group(&store, sales.id, "Field").unwrap();
        assert_eq!(get_group_by_id(&store, sales.id).unwrap().name, "Field");
    }

    #[test]
    fn total_credit_excludes_unbilled_groups() {
        let store = RegistryStore::new();
        let sales = create_group(&store, 1, "Sales").unwrap();
        let ops = create_group(&store, 1, "Ops").unwrap();
        update_group_credit(&store, sales.id, Some(100)).unwrap();
        // Ops stays unbilled (credit = None).

        assert_eq!(total_credit(&store, 1, None), 100);
        assert_eq!(total_credit(&store, 1, Some(&[sales.id, ops.id])), 100);
        assert_eq!(total_credit(&store, 1, Some(&[ops.id])), 0);

        // Zero credit is billed, unlike None.
        update_group_credit(&store, ops.id, Some(0)).unwrap();
        assert_eq!(total_credit(&store, 1, None), 100);
    }

    #[test]
    fn device_count_reflects_memberships() {
        let store = RegistryStore::new();
        let group = create_group(&store, 1, "Sales").unwrap();
        assert_eq!(device_count(&store, group.id), 0);

        let d1 = register_device(
            &store,
            NewDevice { number: "D-001".into(), customer_id: 1, ..Default::default() },
            8,
        )
        .unwrap();
        let d2 = register_device(
            &store,
            NewDevice { number: "D-002".into(), customer_id: 1, ..Default::default() },
            8,
        )
        .unwrap();
        set_device_groups(&store, d1.id, &[group.id]).unwrap();
        set_device_groups(&store, d2.id, &[group.id]).unwrap();
        assert_eq!(device_count(&store, group.id), 2);
    }

    #[test]
    fn remove_group_cascades_memberships() {
        let store = RegistryStore::new();
        let group = create_group(&store, 1, "Sales").unwrap();
        let device = register_device(
            &store,
            NewDevice { number: "D-001".into(), customer_id: 1, ..Default::default() },
            8,
        )
        .unwrap();
        set_device_groups(&store, device.id, &[group.id]).unwrap();

        remove_group(&store, group.id).unwrap();
        assert!(get_group_by_id(&store, group.id).is_none());
        assert_eq!(device_count(&store, group.id), 0);
    }
}
