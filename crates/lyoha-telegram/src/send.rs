//! Outbound side of the Telegram adapter.
//!
//! Telegram caps a message at 4096 characters. Replies are split on line
//! boundaries below that, and sent as plain text.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ReplyParameters};
use tracing::debug;

use lyoha_channels::{ChannelError, MessageSender};
use lyoha_core::types::ChatId;

/// Characters per outbound message.
pub const CHUNK_MAX: usize = 4090;

/// Longest slice of a single line; leaves room for fence markers.
const LINE_MAX: usize = CHUNK_MAX - 64;

/// Longest fence language tag carried over to a continuation chunk.
const FENCE_LANG_MAX: usize = 32;

const CHUNK_DELAY: Duration = Duration::from_millis(100);

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters.
///
/// Splits prefer line boundaries. A chunk that ends inside a fenced code
/// block gets a closing fence, and the next one reopens it with the same
/// language tag. Lengths are counted in characters, never bytes.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.chars().count() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut fence: Option<String> = None;

    for line in text.split('\n') {
        for (index, piece) in hard_wrap(line, LINE_MAX).into_iter().enumerate() {
            let piece_len = piece.chars().count();
            let separator = usize::from(!current.is_empty());
            let closing = if fence.is_some() { 4 } else { 0 };

            if !current.is_empty() && current_len + separator + piece_len + closing > CHUNK_MAX {
                if fence.is_some() {
                    current.push_str("\n```");
                }
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                if let Some(lang) = &fence {
                    current.push_str("```");
                    current.push_str(lang);
                    current_len = 3 + lang.chars().count();
                }
            }

            if !current.is_empty() {
                current.push('\n');
                current_len += 1;
            }
            current.push_str(&piece);
            current_len += piece_len;

            if index == 0 {
                if let Some(tag) = line.trim_start().strip_prefix("```") {
                    fence = match fence {
                        Some(_) => None,
                        None => Some(tag.trim().chars().take(FENCE_LANG_MAX).collect()),
                    };
                }
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Cut `line` into slices of at most `width` characters.
fn hard_wrap(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(width).map(|c| c.iter().collect()).collect()
}

/// [`MessageSender`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

impl TelegramSender {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        in_reply_to: Option<i32>,
    ) -> Result<(), ChannelError> {
        let target = teloxide::types::ChatId(chat_id.0);
        let chunks = split_chunks(text);
        let total = chunks.len();

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut request = self.bot.send_message(target, chunk);
            // Only the first chunk is threaded under the original message.
            if let (0, Some(id)) = (i, in_reply_to) {
                request = request.reply_parameters(
                    ReplyParameters::new(MessageId(id)).allow_sending_without_reply(),
                );
            }
            request
                .await
                .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

            if i + 1 < total {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }

        debug!(%chat_id, chunks = total, "telegram message delivered");
        Ok(())
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<(), ChannelError> {
        self.deliver(chat_id, text, None).await
    }

    async fn reply(&self, chat_id: ChatId, text: &str, in_reply_to: i32) -> Result<(), ChannelError> {
        self.deliver(chat_id, text, Some(in_reply_to)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within_limit(chunks: &[String]) {
        for c in chunks {
            let len = c.chars().count();
            assert!(len <= CHUNK_MAX, "chunk too large: {len}");
        }
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split_chunks("Привет!"), vec!["Привет!".to_string()]);
    }

    #[test]
    fn limit_is_counted_in_characters() {
        // 4090 Cyrillic characters are twice as many bytes.
        let text = "ж".repeat(CHUNK_MAX);
        assert_eq!(split_chunks(&text).len(), 1);
    }

    #[test]
    fn long_text_splits_on_lines() {
        let line = "a".repeat(2000);
        let text = format!("{line}\n{line}\n{line}");
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        assert_within_limit(&chunks);
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn long_multibyte_line_is_cut_on_char_boundaries() {
        let text = "ё".repeat(9000);
        let chunks = split_chunks(&text);
        assert!(chunks.len() >= 3);
        assert_within_limit(&chunks);
        assert_eq!(chunks.concat().chars().count(), 9000);
    }

    #[test]
    fn open_fence_is_closed_and_reopened() {
        let mut text = String::from("Intro.\n```rust\n");
        for i in 0..200 {
            text.push_str(&format!("let variable_name_{i:04} = {i:05}; // comment\n"));
        }
        text.push_str("```\nAfter fence.");

        let chunks = split_chunks(&text);
        assert!(chunks.len() >= 2);
        assert_within_limit(&chunks);
        assert!(chunks[0].ends_with("\n```"));
        assert!(chunks[1].starts_with("```rust\n"));
        assert!(chunks.last().unwrap().ends_with("After fence."));
    }
}
