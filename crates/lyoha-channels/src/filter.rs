//! Addressing filter.
//!
//! Two independent decisions per event: whether it is eligible at all, and
//! whether it is addressed to the bot. Eligible but unaddressed messages still
//! reach the conversation's context; they just never trigger a reply.

use lyoha_core::types::{ChatId, Message};

use crate::allow::AllowList;
use crate::trigger::TriggerSet;
use crate::types::{ChatKind, IncomingEvent, Sender};

/// Placeholder used when a sender exposes neither a name nor a handle.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Why an event was dropped before routing. Expected outcome, not a failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("message has no text")]
    EmptyText,

    #[error("sender could not be identified")]
    UnknownSender,

    #[error("chat {0} is not on the allow-list")]
    NotAllowed(ChatId),
}

/// Drop events without text, without an identifiable sender, or from a
/// conversation outside a non-empty allow-list.
pub fn check_eligibility(event: &IncomingEvent, allow_list: &AllowList) -> Result<(), Rejection> {
    // Whitespace-only text counts as empty.
    if event.text.trim().is_empty() {
        return Err(Rejection::EmptyText);
    }
    if event.sender.is_none() {
        return Err(Rejection::UnknownSender);
    }
    if !allow_list.is_allowed(event.chat_id) {
        return Err(Rejection::NotAllowed(event.chat_id));
    }
    Ok(())
}

/// `true` if the text, or the text of the message it replies to, hits a trigger.
pub fn is_addressed(event: &IncomingEvent, triggers: &TriggerSet) -> bool {
    if triggers.matches(&event.text) {
        return true;
    }
    event
        .reply_to_text
        .as_deref()
        .is_some_and(|quoted| triggers.matches(quoted))
}

/// Display name, then handle, then [`UNKNOWN_SENDER`].
pub fn sender_display_name(sender: Option<&Sender>) -> &str {
    let Some(sender) = sender else {
        return UNKNOWN_SENDER;
    };
    non_blank(sender.first_name.as_deref())
        .or_else(|| non_blank(sender.username.as_deref()))
        .unwrap_or(UNKNOWN_SENDER)
}

/// Name of the conversation as shown to the completion backend.
pub fn chat_display_name(event: &IncomingEvent) -> &str {
    let fallback = match event.chat_kind {
        ChatKind::Private => "User",
        ChatKind::Group => "Group",
        ChatKind::Channel => "Channel",
    };
    non_blank(event.chat_title.as_deref()).unwrap_or(fallback)
}

/// Remove `@bot_username` mentions and surrounding whitespace.
pub fn strip_mention(text: &str, bot_username: Option<&str>) -> String {
    match bot_username.filter(|u| !u.is_empty()) {
        Some(username) => text.replace(&format!("@{username}"), "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Build the user-role message recorded in the conversation context.
pub fn prompt_message(event: &IncomingEvent, bot_username: Option<&str>) -> Message {
    Message::user(format!(
        "[SENDER: {}, RECIPIENT: {}]: {}",
        sender_display_name(event.sender.as_ref()),
        chat_display_name(event),
        strip_mention(&event.text, bot_username),
    ))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
