//! Boundary between the recognition core and a chat transport.
//!
//! Adapters turn platform events into [`shitu_core::InboundMessage`] and
//! hand over a [`ReplyChannel`] for the originating conversation.

use std::sync::Arc;

use tracing::warn;

/// A reply could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("transport rejected message: {0}")]
    Rejected(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Handle for answering the conversation a message came from.
#[async_trait::async_trait]
pub trait ReplyChannel: Send + Sync {
    async fn reply(&self, text: &str) -> Result<(), SendError>;
}

/// Send `text` and swallow the failure after logging it.
///
/// There is no channel left to report a failed reply through.
pub async fn reply_logged(channel: &Arc<dyn ReplyChannel>, text: &str) {
    if let Err(e) = channel.reply(text).await {
        warn!("Failed to send reply: {}", e);
    }
}
