//! Update handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use lyoha_channels::{ChatBot, ChatKind, IncomingEvent, Sender};
use lyoha_core::types::ChatId;

/// Entry point for every message and channel post.
///
/// Never blocks on the completion backend: the event is queued on its
/// conversation worker and the handler returns immediately.
pub async fn handle_message(msg: Message, chat_bot: Arc<ChatBot>) -> ResponseResult<()> {
    if is_from_bot(&msg) {
        return Ok(());
    }

    let event = to_incoming_event(&msg);
    if let Err(e) = chat_bot.handle_event(event) {
        warn!(error = %e, chat_id = msg.chat.id.0, "Telegram: failed to route message");
    }
    Ok(())
}

/// Messages from other bots (and our own echoes) are never processed.
pub fn is_from_bot(msg: &Message) -> bool {
    msg.from.as_ref().is_some_and(|u| u.is_bot)
}

/// Map a Telegram message onto the transport-neutral event.
///
/// Channel posts carry no `from`; the posting chat stands in as the sender.
/// Media captions count as text.
pub fn to_incoming_event(msg: &Message) -> IncomingEvent {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    };

    let chat_title = msg
        .chat
        .title()
        .or_else(|| msg.chat.first_name())
        .map(str::to_string);

    let sender = match (&msg.from, &msg.sender_chat) {
        (Some(user), _) => Some(Sender {
            id: user.id.0 as i64,
            first_name: Some(user.first_name.clone()),
            username: user.username.clone(),
        }),
        (None, Some(chat)) => Some(Sender {
            id: chat.id.0,
            first_name: chat.title().map(str::to_string),
            username: chat.username().map(str::to_string),
        }),
        (None, None) => None,
    };

    IncomingEvent {
        message_id: msg.id.0,
        chat_id: ChatId(msg.chat.id.0),
        chat_kind,
        chat_title,
        sender,
        text: msg.text().or(msg.caption()).unwrap_or_default().to_string(),
        reply_to_text: msg
            .reply_to_message()
            .and_then(|quoted| quoted.text().or(quoted.caption()))
            .map(str::to_string),
    }
}
