use serde::{Deserialize, Serialize};

use lyoha_core::types::ChatId;

/// Kind of conversation an event arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// One-to-one chat with a user.
    Private,
    /// Group or supergroup.
    Group,
    /// Broadcast channel.
    Channel,
}

impl ChatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Channel => "channel",
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform-native user (or sender chat) identifier.
    pub id: i64,

    /// Human display name, if the platform exposes one.
    pub first_name: Option<String>,

    /// Handle without the leading `@`.
    pub username: Option<String>,
}

/// A message received from a transport, reduced to what the routing core needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Platform message ID, used to thread the reply.
    pub message_id: i32,

    pub chat_id: ChatId,

    pub chat_kind: ChatKind,

    /// Group/channel title, or the peer's first name in a private chat.
    pub chat_title: Option<String>,

    /// `None` when the transport could not identify the author.
    pub sender: Option<Sender>,

    /// Text (or caption). Empty when the message carried none.
    pub text: String,

    /// Text of the message this one replies to, if any.
    pub reply_to_text: Option<String>,
}
