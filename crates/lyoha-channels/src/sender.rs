use async_trait::async_trait;

use lyoha_core::types::ChatId;

use crate::error::ChannelError;

/// Outbound side of a transport.
///
/// Implementations must be `Send + Sync`: every conversation worker holds a
/// shared reference and may send concurrently.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Post `text` to `chat_id` as a new message.
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), ChannelError>;

    /// Post `text` to `chat_id` threaded under message `in_reply_to`.
    async fn reply(&self, chat_id: ChatId, text: &str, in_reply_to: i32) -> Result<(), ChannelError>;
}
