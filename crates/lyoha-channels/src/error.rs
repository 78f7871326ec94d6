use thiserror::Error;

use lyoha_agent::AssistantError;
use lyoha_core::LyohaError;

/// Errors raised while routing a message or delivering a reply.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The transport refused or failed to deliver an outbound message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The dispatcher was shut down and accepts no more messages.
    #[error("Dispatcher is shut down")]
    DispatcherClosed,

    #[error(transparent)]
    Assistant(#[from] AssistantError),

    #[error(transparent)]
    Core(#[from] LyohaError),
}
