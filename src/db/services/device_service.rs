use tracing::{info, warn};

use crate::db::models::{Device, DeviceApplication, DeviceLookupItem, NewDevice};
use crate::db::services::access_service;
use crate::db::store::{RegistryStore, now_ms};
use crate::error::AppError;

/// A device is considered online if it reported within the last hour.
const ONLINE_WINDOW_MS: i64 = 3_600_000;

// --- Device Registry Functions ---

/// Trailing `k` characters of a device number, or the whole number when it
/// is shorter.
fn trailing_chars(number: &str, k: usize) -> String {
    let len = number.chars().count();
    if len <= k {
        number.to_owned()
    } else {
        number.chars().skip(len - k).collect()
    }
}

/// Registers a device administratively. Fails with Conflict when the
/// number is already taken within the tenant. The fast-search column is
/// assigned eagerly so a freshly registered device is immediately findable.
pub fn register_device(
    store: &RegistryStore,
    new: NewDevice,
    fast_search_chars: usize,
) -> Result<Device, AppError> {
    if new.number.trim().is_empty() {
        return Err(AppError::Validation("device number is required".to_owned()));
    }
    let taken = store
        .devices
        .iter()
        .any(|d| d.customer_id == new.customer_id && d.number == new.number);
    if taken {
        return Err(AppError::Conflict(format!(
            "device number already registered: {}",
            new.number
        )));
    }

    let id = store.next_device_id();
    let device = Device {
        id,
        fast_search: Some(trailing_chars(&new.number, fast_search_chars)),
        number: new.number,
        old_number: None,
        imei: new.imei,
        serial: new.serial,
        phone: new.phone,
        description: new.description,
        customer_id: new.customer_id,
        configuration_id: new.configuration_id,
        info: None,
        custom1: new.custom1,
        custom2: new.custom2,
        custom3: new.custom3,
        enroll_time: None,
        last_update: None,
        imei_update_ts: None,
        public_ip: None,
    };
    store.devices.insert(id, device.clone());
    info!(device_id = id, number = %device.number, customer_id = device.customer_id, "device registered");
    Ok(device)
}

pub fn get_device_by_id(store: &RegistryStore, device_id: i32) -> Option<Device> {
    store.devices.get(&device_id).map(|d| d.value().clone())
}

/// Ingests a heartbeat. Sets the telemetry blob, bumps `last_update`, and
/// sets `enroll_time` only if it was never set before (first contact wins,
/// later heartbeats never overwrite it). Last writer wins; there is no
/// optimistic-lock check.
pub fn upsert_heartbeat(
    store: &RegistryStore,
    device_id: i32,
    info: serde_json::Value,
    imei_update_ts: Option<i64>,
    public_ip: Option<String>,
) -> Result<(), AppError> {
    let mut device = store
        .devices
        .get_mut(&device_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;

    let now = now_ms();
    device.info = Some(info);
    device.last_update = Some(now);
    device.enroll_time = device.enroll_time.or(Some(now));
    device.imei_update_ts = imei_update_ts;
    device.public_ip = public_ip;
    Ok(())
}

/// Recomputes the fast-search column for every device whose value is
/// missing or of the wrong length. Self-healing: safe to run repeatedly and
/// concurrently with heartbeats, since it only writes `fast_search` and
/// skips rows that already carry the right value. Returns the number of
/// rows actually rewritten.
pub fn reindex_fast_search(store: &RegistryStore, k: usize) -> usize {
    let mut updated = 0;
    for mut device in store.devices.iter_mut() {
        let stale = device
            .fast_search
            .as_ref()
            .map(|fs| fs.chars().count() != k)
            .unwrap_or(true);
        if !stale {
            continue;
        }
        let recomputed = trailing_chars(&device.number, k);
        if device.fast_search.as_deref() != Some(recomputed.as_str()) {
            device.fast_search = Some(recomputed);
            updated += 1;
        }
    }
    if updated > 0 {
        info!(updated, fast_search_chars = k, "fast-search index reindexed");
    }
    updated
}

/// Partial-number lookup: matches devices whose fast-search suffix (or the
/// full number, when it is shorter than the index width) ends with the
/// typed filter, restricted to the caller's access scope. Exact number
/// matches sort first, then by number; the result is a single snapshot
/// capped at `limit`.
pub fn lookup_devices(
    store: &RegistryStore,
    user_id: i32,
    customer_id: i32,
    filter: &str,
    limit: usize,
) -> Result<Vec<DeviceLookupItem>, AppError> {
    if filter.is_empty() {
        return Ok(Vec::new());
    }

    let tenant_devices: Vec<Device> = store
        .devices
        .iter()
        .filter(|d| d.customer_id == customer_id)
        .map(|d| d.value().clone())
        .collect();

    let mut matches: Vec<Device> =
        access_service::filter_devices(store, user_id, customer_id, tenant_devices)?
            .into_iter()
            .filter(|d| {
                d.fast_search
                    .as_deref()
                    .unwrap_or(d.number.as_str())
                    .ends_with(filter)
            })
            .collect();

    matches.sort_by(|a, b| {
        let a_exact = a.number.eq_ignore_ascii_case(filter);
        let b_exact = b.number.eq_ignore_ascii_case(filter);
        b_exact.cmp(&a_exact).then_with(|| a.number.cmp(&b.number))
    });
    matches.truncate(limit);

    Ok(matches
        .into_iter()
        .map(|d| DeviceLookupItem {
            id: d.id,
            number: d.number,
            description: d.description,
        })
        .collect())
}

/// Deletes a device and cascades its membership and status rows.
pub fn remove_device(store: &RegistryStore, device_id: i32) -> Result<(), AppError> {
    let removed = store.devices.remove(&device_id);
    if removed.is_none() {
        return Err(AppError::NotFound(format!("device {device_id}")));
    }
    store.device_groups.remove(&device_id);
    store.device_statuses.remove(&device_id);
    info!(device_id, "device removed");
    Ok(())
}

pub fn update_device_description(
    store: &RegistryStore,
    device_id: i32,
    description: Option<String>,
) -> Result<(), AppError> {
    let mut device = store
        .devices
        .get_mut(&device_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;
    device.description = description;
    Ok(())
}

pub fn update_device_configuration(
    store: &RegistryStore,
    device_id: i32,
    configuration_id: Option<i32>,
) -> Result<(), AppError> {
    let mut device = store
        .devices
        .get_mut(&device_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;
    device.configuration_id = configuration_id;
    Ok(())
}

pub fn update_device_custom_properties(
    store: &RegistryStore,
    device_id: i32,
    custom1: Option<String>,
    custom2: Option<String>,
    custom3: Option<String>,
) -> Result<(), AppError> {
    let mut device = store
        .devices
        .get_mut(&device_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;
    device.custom1 = custom1;
    device.custom2 = custom2;
    device.custom3 = custom3;
    Ok(())
}

/// Drops the previous number once operators have migrated a renumbered
/// device; it is no longer reachable by the old identifier afterwards.
pub fn clear_old_number(store: &RegistryStore, device_id: i32) -> Result<(), AppError> {
    let mut device = store
        .devices
        .get_mut(&device_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;
    device.old_number = None;
    Ok(())
}

/// Replaces a device's group memberships. Every target group must exist
/// and belong to the device's tenant.
pub fn set_device_groups(
    store: &RegistryStore,
    device_id: i32,
    group_ids: &[i32],
) -> Result<(), AppError> {
    let customer_id = store
        .devices
        .get(&device_id)
        .map(|d| d.customer_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;

    for group_id in group_ids {
        let group = store
            .groups
            .get(group_id)
            .ok_or_else(|| AppError::NotFound(format!("group {group_id}")))?;
        if group.customer_id != customer_id {
            return Err(AppError::Validation(format!(
                "group {group_id} belongs to another tenant"
            )));
        }
    }

    store
        .device_groups
        .insert(device_id, group_ids.iter().copied().collect());
    Ok(())
}

/// Removes the device's memberships in groups the caller can see, leaving
/// memberships outside the caller's scope untouched. The predicate and the
/// delete run under the membership row's entry guard, so a concurrently
/// added out-of-scope membership can never be swept away by a stale read.
/// Returns the number of memberships removed.
pub fn remove_device_groups_scoped(
    store: &RegistryStore,
    user_id: i32,
    customer_id: i32,
    device_id: i32,
) -> Result<usize, AppError> {
    if !store.devices.contains_key(&device_id) {
        return Err(AppError::NotFound(format!("device {device_id}")));
    }
    let visible = access_service::visible_groups(store, user_id, customer_id)?;

    let mut memberships = store.device_groups.entry(device_id).or_default();
    let before = memberships.len();
    memberships.retain(|group_id| !visible.contains(group_id));
    let removed = before - memberships.len();
    if removed > 0 {
        info!(device_id, user_id, removed, "scoped group memberships removed");
    }
    Ok(removed)
}

pub fn get_device_groups(store: &RegistryStore, device_id: i32) -> Vec<i32> {
    store
        .device_groups
        .get(&device_id)
        .map(|g| g.iter().copied().collect())
        .unwrap_or_default()
}

/// All devices of a tenant that belong to the given group.
pub fn devices_in_group(store: &RegistryStore, customer_id: i32, group_id: i32) -> Vec<Device> {
    store
        .devices
        .iter()
        .filter(|d| {
            d.customer_id == customer_id
                && store
                    .device_groups
                    .get(&d.id)
                    .is_some_and(|groups| groups.contains(&group_id))
        })
        .map(|d| d.value().clone())
        .collect()
}

pub fn count_devices_for_customer(store: &RegistryStore, customer_id: i32) -> i64 {
    store
        .devices
        .iter()
        .filter(|d| d.customer_id == customer_id)
        .count() as i64
}

/// Devices whose last heartbeat falls within the online window.
pub fn count_online_devices(store: &RegistryStore) -> i64 {
    let threshold = now_ms() - ONLINE_WINDOW_MS;
    store
        .devices
        .iter()
        .filter(|d| d.last_update.is_some_and(|ts| ts >= threshold))
        .count() as i64
}

/// Applications reported by the device in the `applications` array of its
/// telemetry blob. A device that never reported, or reported a malformed
/// array, yields an empty list rather than an error.
pub fn installed_applications(
    store: &RegistryStore,
    device_id: i32,
) -> Result<Vec<DeviceApplication>, AppError> {
    let device = store
        .devices
        .get(&device_id)
        .ok_or_else(|| AppError::NotFound(format!("device {device_id}")))?;

    let Some(apps) = device.info.as_ref().and_then(|info| info.get("applications")).cloned() else {
        return Ok(Vec::new());
    };
    match serde_json::from_value::<Vec<DeviceApplication>>(apps) {
        Ok(apps) => Ok(apps),
        Err(err) => {
            warn!(device_id, error = %err, "malformed applications array in device info");
            Ok(Vec::new())
        }
    }
}
