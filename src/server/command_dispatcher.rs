use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::push::{MessageType, PushMessage, PushRelay};
use crate::server::identity::IdentityResolver;

// Monotonic sequence for correlating dispatch log lines with relay-side
// delivery logs; push messages themselves carry no id.
static NEXT_DISPATCH_SEQ: AtomicU64 = AtomicU64::new(1);

/// Entry point for fleet commands. Each invocation is stateless: resolve
/// the device, build the push message, hand it to the relay, answer. The
/// dispatch is fire-and-forget: delivery is at-most-once and device-side
/// execution is never observed; retrying means re-issuing the command.
#[derive(Clone)]
pub struct CommandDispatcher {
    resolver: IdentityResolver,
    relay: Arc<dyn PushRelay>,
}

impl CommandDispatcher {
    pub fn new(resolver: IdentityResolver, relay: Arc<dyn PushRelay>) -> Self {
        CommandDispatcher { resolver, relay }
    }

    pub async fn reboot(&self, number: &str) -> Result<(), AppError> {
        self.send_command(number, MessageType::Reboot, None).await
    }

    pub async fn factory_reset(&self, number: &str) -> Result<(), AppError> {
        self.send_command(number, MessageType::FactoryReset, None).await
    }

    pub async fn lock(&self, number: &str) -> Result<(), AppError> {
        self.send_command(number, MessageType::LockDevice, None).await
    }

    pub async fn uninstall_mdm(&self, number: &str) -> Result<(), AppError> {
        self.send_command(number, MessageType::UninstallMdm, None).await
    }

    /// Pushes a password reset. The password is validated before the
    /// device is even looked up, so an empty one has zero side effects.
    /// The payload carries the password verbatim; this core does not
    /// encrypt it.
    pub async fn reset_password(&self, number: &str, password: &str) -> Result<(), AppError> {
        if password.is_empty() {
            return Err(AppError::Validation("password is required".to_owned()));
        }
        let payload = serde_json::json!({ "password": password }).to_string();
        self.send_command(number, MessageType::ResetPassword, Some(payload))
            .await
    }

    async fn send_command(
        &self,
        number: &str,
        message_type: MessageType,
        payload: Option<String>,
    ) -> Result<(), AppError> {
        let Some(device) = self.resolver.resolve(number) else {
            warn!(device = %number, command = message_type.wire_name(), "command for unknown device");
            return Err(AppError::NotFound(format!("device not found: {number}")));
        };

        let message = PushMessage {
            device_id: device.id,
            message_type,
            payload,
        };
        let seq = NEXT_DISPATCH_SEQ.fetch_add(1, Ordering::Relaxed);

        match self.relay.send(message).await {
            Ok(()) => {
                info!(seq, device = %number, device_id = device.id,
                      command = message_type.wire_name(), "command dispatched");
                Ok(())
            }
            Err(e) => {
                error!(seq, device = %number, device_id = device.id,
                       command = message_type.wire_name(), error = %e,
                       "push relay failure");
                Err(AppError::Internal("failed to send command".to_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewDevice;
    use crate::db::services::register_device;
    use crate::db::store::RegistryStore;
    use crate::push::RelayError;
    use crate::push::channel::ChannelPushRelay;
    use crate::server::response::CommandResponse;
    use async_trait::async_trait;

    struct FailingRelay;

    #[async_trait]
    impl PushRelay for FailingRelay {
        async fn send(&self, _message: PushMessage) -> Result<(), RelayError> {
            Err(RelayError::Unavailable("transport down".to_owned()))
        }
    }

    fn dispatcher_with_device(
        number: &str,
    ) -> (CommandDispatcher, tokio::sync::mpsc::Receiver<PushMessage>, i32) {
        let store = Arc::new(RegistryStore::new());
        let device = register_device(
            &store,
            NewDevice { number: number.to_owned(), customer_id: 1, ..Default::default() },
            8,
        )
        .unwrap();
        let (relay, rx) = ChannelPushRelay::new(8);
        let dispatcher = CommandDispatcher::new(IdentityResolver::new(store), Arc::new(relay));
        (dispatcher, rx, device.id)
    }

    #[tokio::test]
    async fn lock_sends_push_message_for_enrolled_device() {
        let (dispatcher, mut rx, device_id) = dispatcher_with_device("D-001");

        dispatcher.lock("D-001").await.unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.device_id, device_id);
        assert_eq!(message.message_type, MessageType::LockDevice);
        assert_eq!(message.payload, None);
    }

    #[tokio::test]
    async fn unknown_device_returns_not_found_without_push() {
        let store = Arc::new(RegistryStore::new());
        let (relay, mut rx) = ChannelPushRelay::new(8);
        let dispatcher = CommandDispatcher::new(IdentityResolver::new(store), Arc::new(relay));

        let result = dispatcher.lock("D-001").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reset_password_embeds_password_payload() {
        let (dispatcher, mut rx, device_id) = dispatcher_with_device("D-001");

        dispatcher.reset_password("D-001", "s3cret").await.unwrap();

        let message = rx.recv().await.unwrap();
        assert_eq!(message.device_id, device_id);
        assert_eq!(message.message_type, MessageType::ResetPassword);
        let payload: serde_json::Value =
            serde_json::from_str(message.payload.as_deref().unwrap()).unwrap();
        assert_eq!(payload, serde_json::json!({"password": "s3cret"}));
    }

    #[tokio::test]
    async fn empty_password_is_rejected_before_any_lookup_or_push() {
        let (dispatcher, mut rx, _) = dispatcher_with_device("D-001");

        let result = dispatcher.reset_password("D-001", "").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(rx.try_recv().is_err());

        // Even an unknown device number reports the validation error, not
        // NotFound: nothing is resolved before the check.
        let result = dispatcher.reset_password("NO-SUCH", "").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn relay_failure_surfaces_as_generic_internal_error() {
        let store = Arc::new(RegistryStore::new());
        register_device(
            &store,
            NewDevice { number: "D-001".into(), customer_id: 1, ..Default::default() },
            8,
        )
        .unwrap();
        let dispatcher =
            CommandDispatcher::new(IdentityResolver::new(store), Arc::new(FailingRelay));

        let result = dispatcher.reboot("D-001").await;
        let Err(err) = result else { panic!("expected relay failure") };
        assert!(matches!(err, AppError::Internal(_)));

        // The envelope hides internal detail behind a generic message.
        let response = CommandResponse::from(err);
        assert!(!response.is_ok());
        assert_eq!(response.message.as_deref(), Some("Internal error"));
    }

    #[tokio::test]
    async fn dispatch_resolves_by_old_number_and_imei() {
        let store = Arc::new(RegistryStore::new());
        let device = register_device(
            &store,
            NewDevice {
                number: "NEW-1".into(),
                customer_id: 1,
                imei: Some("350000000000001".into()),
                ..Default::default()
            },
            8,
        )
        .unwrap();
        {
            let mut row = store.devices.get_mut(&device.id).unwrap();
            row.old_number = Some("OLD-1".into());
        }
        let (relay, mut rx) = ChannelPushRelay::new(8);
        let dispatcher = CommandDispatcher::new(IdentityResolver::new(store), Arc::new(relay));

        dispatcher.reboot("OLD-1").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().device_id, device.id);

        dispatcher.factory_reset("350000000000001").await.unwrap();
        let message = rx.recv().await.unwrap();
        assert_eq!(message.device_id, device.id);
        assert_eq!(message.message_type, MessageType::FactoryReset);
    }
}
