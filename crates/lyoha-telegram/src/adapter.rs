//! Telegram channel adapter.
//!
//! Drives a teloxide long-polling `Dispatcher` in a background task. Messages
//! and channel posts both flow into [`handle_message`].

use std::sync::Arc;

use teloxide::dispatching::ShutdownToken;
use teloxide::prelude::*;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lyoha_channels::ChatBot;
use lyoha_core::config::TelegramConfig;

use crate::error::TelegramError;
use crate::handler::handle_message;

/// Telegram channel adapter.
pub struct TelegramAdapter {
    bot: Bot,
    username: Option<String>,
}

impl TelegramAdapter {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        if config.bot_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        Ok(Self {
            bot: Bot::new(config.bot_token.trim()),
            username: None,
        })
    }

    /// Handle for outbound calls; cheap to clone.
    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Ask Telegram who we are. Fails fast on a bad token.
    pub async fn connect(&mut self) -> Result<Option<String>, TelegramError> {
        let me = self.bot.get_me().await?;
        self.username = me.user.username.clone();
        info!(
            id = me.user.id.0,
            username = self.username.as_deref().unwrap_or("-"),
            "Telegram: connected"
        );
        Ok(self.username.clone())
    }

    /// Start long polling. Returns immediately; stop through the handle.
    pub fn start(self, chat_bot: Arc<ChatBot>) -> AdapterHandle {
        info!("Telegram: starting long-polling dispatcher");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handle_message))
            .branch(Update::filter_channel_post().endpoint(handle_message));

        let mut dispatcher = Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![chat_bot])
            .default_handler(|_upd| async {})
            .build();
        let token = dispatcher.shutdown_token();
        let task = tokio::spawn(async move { dispatcher.dispatch().await });

        AdapterHandle { token, task }
    }
}

/// Running dispatcher.
pub struct AdapterHandle {
    token: ShutdownToken,
    task: JoinHandle<()>,
}

impl AdapterHandle {
    /// Stop polling and wait for in-flight handlers to return.
    pub async fn stop(self) {
        match self.token.shutdown() {
            Ok(done) => {
                done.await;
                join_polling(self.task).await;
            }
            Err(_) => {
                // Not polling yet; nothing to drain.
                debug!("Telegram: dispatcher idle at shutdown");
                self.task.abort();
            }
        }
        info!("Telegram: dispatcher stopped");
    }
}

/// Await the polling task; a panic or cancellation is logged, not propagated.
async fn join_polling(task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!(error = %e, "Telegram: polling task ended abnormally");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crashed_polling_task_is_logged_not_propagated() {
        let task = tokio::spawn(async { panic!("poller crashed"); });
        join_polling(task).await;
    }

    #[tokio::test]
    async fn finished_polling_task_joins_cleanly() {
        let task = tokio::spawn(async {});
        join_polling(task).await;
    }

    #[test]
    fn blank_token_is_rejected() {
        let config = TelegramConfig {
            bot_token: "  ".to_string(),
        };
        assert!(matches!(
            TelegramAdapter::new(&config),
            Err(TelegramError::NoToken)
        ));
    }
}
