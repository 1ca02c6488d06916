use serde::{Deserialize, Serialize};

/// An enrolled device.
/// Corresponds to the `devices` table of the registry store.
///
/// Timestamps (`enroll_time`, `last_update`, `imei_update_ts`) are epoch
/// milliseconds. `enroll_time` is set on the first heartbeat and never
/// overwritten afterwards. `customer_id` never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i32,
    pub number: String,
    /// Previous device number, kept after a renumbering so the device
    /// stays reachable until operators complete the migration.
    pub old_number: Option<String>,
    pub imei: Option<String>,
    pub serial: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub customer_id: i32,
    pub configuration_id: Option<i32>,
    /// Device-reported telemetry blob (installed apps, location, battery).
    pub info: Option<serde_json::Value>,
    pub custom1: Option<String>,
    pub custom2: Option<String>,
    pub custom3: Option<String>,
    pub enroll_time: Option<i64>,
    pub last_update: Option<i64>,
    pub imei_update_ts: Option<i64>,
    pub public_ip: Option<String>,
    /// Trailing characters of `number`, maintained by the reindex job for
    /// quick partial-number lookup.
    pub fast_search: Option<String>,
}

/// Input for administrative device registration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    pub number: String,
    pub customer_id: i32,
    pub configuration_id: Option<i32>,
    pub description: Option<String>,
    pub imei: Option<String>,
    pub serial: Option<String>,
    pub phone: Option<String>,
    pub custom1: Option<String>,
    pub custom2: Option<String>,
    pub custom3: Option<String>,
}

/// A device group. `name` is unique within a tenant.
/// `credit` is nullable on purpose: `None` means "not billed", which is
/// distinct from a credit of zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i32,
    pub customer_id: i32,
    pub name: String,
    pub credit: Option<i32>,
}

/// The identity surface the access scope needs. Users with
/// `all_devices_available` see every group and device of their tenant;
/// everyone else sees only explicitly granted groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub customer_id: i32,
    pub all_devices_available: bool,
}

/// Per-device rollout status, upserted by `report_status`.
/// The two status fields are opaque tags whose value set is a contract of
/// the reporting collaborator; this core only stores and compares them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub device_id: i32,
    pub config_files_status: String,
    pub applications_status: String,
}

/// Lightweight device summary returned by partial-number lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLookupItem {
    pub id: i32,
    pub number: String,
    pub description: Option<String>,
}

/// One entry of the `applications` array inside the device `info` blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceApplication {
    #[serde(default)]
    pub pkg: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}
