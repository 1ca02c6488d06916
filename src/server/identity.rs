use std::sync::Arc;

use crate::db::models::Device;
use crate::db::store::RegistryStore;

/// Resolves a device from an externally supplied identifier. Resolution
/// order, first match wins: exact number, case-insensitive number, old
/// number (a renumbered device stays reachable by its prior number until
/// operators migrate), then IMEI or serial. Pure lookup, no side effects;
/// `None` is the not-found outcome, not an error.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<RegistryStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<RegistryStore>) -> Self {
        IdentityResolver { store }
    }

    pub fn resolve(&self, identifier: &str) -> Option<Device> {
        let devices = &self.store.devices;

        if let Some(d) = devices.iter().find(|d| d.number == identifier) {
            return Some(d.value().clone());
        }
        if let Some(d) = devices
            .iter()
            .find(|d| d.number.eq_ignore_ascii_case(identifier))
        {
            return Some(d.value().clone());
        }
        if let Some(d) = devices
            .iter()
            .find(|d| d.old_number.as_deref() == Some(identifier))
        {
            return Some(d.value().clone());
        }
        devices
            .iter()
            .find(|d| {
                d.imei.as_deref() == Some(identifier) || d.serial.as_deref() == Some(identifier)
            })
            .map(|d| d.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewDevice;
    use crate::db::services::register_device;

    fn store_with(devices: Vec<NewDevice>) -> Arc<RegistryStore> {
        let store = Arc::new(RegistryStore::new());
        for d in devices {
            register_device(&store, d, 8).unwrap();
        }
        store
    }

    #[test]
    fn exact_number_wins_over_case_insensitive() {
        let store = store_with(vec![
            NewDevice { number: "abc-1".into(), customer_id: 1, ..Default::default() },
            NewDevice { number: "ABC-1".into(), customer_id: 1, ..Default::default() },
        ]);
        let resolver = IdentityResolver::new(store);

        let hit = resolver.resolve("ABC-1").unwrap();
        assert_eq!(hit.number, "ABC-1");
        // Case-insensitive fallback still resolves a lone mismatch.
        let hit = resolver.resolve("aBc-1").unwrap();
        assert!(hit.number.eq_ignore_ascii_case("abc-1"));
    }

    #[test]
    fn falls_back_to_old_number_then_imei_or_serial() {
        let store = store_with(vec![NewDevice {
            number: "NEW-42".into(),
            customer_id: 1,
            imei: Some("350000000000001".into()),
            serial: Some("SER-9".into()),
            ..Default::default()
        }]);
        {
            let mut device = store.devices.iter_mut().next().unwrap();
            device.old_number = Some("OLD-42".into());
        }
        let resolver = IdentityResolver::new(store);

        assert_eq!(resolver.resolve("OLD-42").unwrap().number, "NEW-42");
        assert_eq!(resolver.resolve("350000000000001").unwrap().number, "NEW-42");
        assert_eq!(resolver.resolve("SER-9").unwrap().number, "NEW-42");
        assert!(resolver.resolve("nowhere").is_none());
    }
}
