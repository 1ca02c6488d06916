use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub mod channel;

/// Message types carried over the push channel. Dispatchable fleet
/// commands are a closed set matched exhaustively at compile time; an
/// unrecognized wire string (for example a device-originated type this
/// core does not handle) decodes to `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Reboot,
    FactoryReset,
    LockDevice,
    ResetPassword,
    UninstallMdm,
    Unknown,
}

impl MessageType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            MessageType::Reboot => "reboot",
            MessageType::FactoryReset => "factoryReset",
            MessageType::LockDevice => "lockDevice",
            MessageType::ResetPassword => "resetPassword",
            MessageType::UninstallMdm => "uninstallMdm",
            MessageType::Unknown => "unknown",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "reboot" => MessageType::Reboot,
            "factoryReset" => MessageType::FactoryReset,
            "lockDevice" => MessageType::LockDevice,
            "resetPassword" => MessageType::ResetPassword,
            "uninstallMdm" => MessageType::UninstallMdm,
            _ => MessageType::Unknown,
        }
    }
}

// Symmetric encode/decode at the wire boundary: known types round-trip,
// anything else comes back as `Unknown`.
impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(MessageType::from_wire(&value))
    }
}

/// A single message handed to the push relay. Created transiently per
/// dispatch; delivery persistence, if any, is the relay's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub device_id: i32,
    pub message_type: MessageType,
    /// Opaque payload, typically JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("push relay unavailable: {0}")]
    Unavailable(String),
}

/// The outbound seam to the external push transport. Delivery is
/// at-most-once and unacknowledged from this side; callers must not expect
/// to observe device-side execution.
#[async_trait]
pub trait PushRelay: Send + Sync {
    async fn send(&self, message: PushMessage) -> Result<(), RelayError>;
}
