use crate::db::models::DeviceStatus;
use crate::db::store::RegistryStore;
use crate::error::AppError;

// --- Status Tracker Functions ---

/// Upserts the device's rollout status row: insert on first report,
/// overwrite both fields afterwards. Keyed by device id, so a device never
/// accumulates more than one row; repeating an identical report changes
/// nothing. The status values themselves are a contract of the reporting
/// collaborator and are stored as-is.
pub fn report_status(
    store: &RegistryStore,
    device_id: i32,
    config_files_status: &str,
    applications_status: &str,
) -> Result<(), AppError> {
    if !store.devices.contains_key(&device_id) {
        return Err(AppError::NotFound(format!("device {device_id}")));
    }
    store
        .device_statuses
        .entry(device_id)
        .and_modify(|row| {
            row.config_files_status = config_files_status.to_owned();
            row.applications_status = applications_status.to_owned();
        })
        .or_insert_with(|| DeviceStatus {
            device_id,
            config_files_status: config_files_status.to_owned(),
            applications_status: applications_status.to_owned(),
        });
    Ok(())
}

pub fn get_status(store: &RegistryStore, device_id: i32) -> Option<DeviceStatus> {
    store.device_statuses.get(&device_id).map(|s| s.value().clone())
}
