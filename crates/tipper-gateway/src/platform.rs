use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("failed to send message to {target}: {reason}")]
pub struct SendError {
    pub target: String,
    pub reason: String,
}

/// Outbound half of the messaging platform.
///
/// The inbound half is an `mpsc::Receiver<PlatformEvent>` owned by the
/// session loop.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Post `text` to a channel, or to a user's DM when `target` is an identity.
    async fn send_message(&self, target: &str, text: &str) -> Result<(), SendError>;

    /// Human-readable name for an identity, if the platform can tell us.
    async fn display_name(&self, identity: &str) -> Option<String>;
}
