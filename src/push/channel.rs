use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{PushMessage, PushRelay, RelayError};

/// Relay backed by a bounded channel whose receiving end is owned by the
/// transport task. If the transport side is gone, sending fails and the
/// dispatcher surfaces an internal error; nothing is buffered beyond the
/// channel capacity.
pub struct ChannelPushRelay {
    tx: mpsc::Sender<PushMessage>,
}

impl ChannelPushRelay {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PushMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelPushRelay { tx }, rx)
    }
}

#[async_trait]
impl PushRelay for ChannelPushRelay {
    async fn send(&self, message: PushMessage) -> Result<(), RelayError> {
        self.tx
            .send(message)
            .await
            .map_err(|e| RelayError::Unavailable(e.to_string()))
    }
}
