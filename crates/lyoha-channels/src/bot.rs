//! Bot facade: transport events in, replies out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use lyoha_agent::ChatAssistant;
use lyoha_core::config::BotConfig;
use lyoha_core::types::{ChatId, Message};

use crate::allow::AllowList;
use crate::dispatcher::{Dispatcher, Job};
use crate::error::ChannelError;
use crate::filter::{self, Rejection};
use crate::sender::MessageSender;
use crate::trigger::TriggerSet;
use crate::types::IncomingEvent;

/// Wires the addressing filter to the per-conversation dispatcher.
pub struct ChatBot {
    name: String,
    bot_username: Option<String>,
    triggers: TriggerSet,
    allow_list: Arc<AllowList>,
    assistant: Arc<dyn ChatAssistant>,
    sender: Arc<dyn MessageSender>,
    dispatcher: Dispatcher,
}

impl ChatBot {
    /// Fails with `InvalidConfiguration` for an empty name, an empty trigger
    /// vocabulary or a zero context size.
    pub fn new(
        config: &BotConfig,
        context_size: usize,
        allow_list: Arc<AllowList>,
        assistant: Arc<dyn ChatAssistant>,
        sender: Arc<dyn MessageSender>,
    ) -> lyoha_core::Result<Self> {
        if config.name.trim().is_empty() {
            return Err(lyoha_core::LyohaError::InvalidConfiguration(
                "bot name must not be empty".into(),
            ));
        }
        let triggers = TriggerSet::new(&config.trigger_words)?;
        let dispatcher = Dispatcher::new(
            config.name.clone(),
            context_size,
            Arc::clone(&assistant),
            Arc::clone(&sender),
        )?;

        Ok(Self {
            name: config.name.clone(),
            bot_username: None,
            triggers,
            allow_list,
            assistant,
            sender,
            dispatcher,
        })
    }

    /// The bot's own `@username`, stripped from incoming text.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        self.bot_username = Some(username.trim_start_matches('@').to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn allow_chat(&self, chat_id: ChatId) {
        if self.allow_list.allow(chat_id) {
            info!(%chat_id, "chat allowed");
        }
    }

    pub fn disallow_chat(&self, chat_id: ChatId) {
        if self.allow_list.disallow(chat_id) {
            info!(%chat_id, "chat disallowed");
        }
    }

    /// Run both filter decisions. `Ok(addressed)` for eligible events.
    pub fn classify(&self, event: &IncomingEvent) -> Result<bool, Rejection> {
        filter::check_eligibility(event, &self.allow_list)?;
        Ok(filter::is_addressed(event, &self.triggers))
    }

    /// Filter `event` and hand it to its conversation worker.
    ///
    /// Rejected events are dropped silently. Returns as soon as the event is
    /// queued; the reply (if any) is sent later by the worker.
    pub fn handle_event(&self, event: IncomingEvent) -> Result<(), ChannelError> {
        let addressed = match self.classify(&event) {
            Ok(addressed) => addressed,
            Err(reason) => {
                debug!(chat_id = %event.chat_id, %reason, "event dropped");
                return Ok(());
            }
        };

        let message = filter::prompt_message(&event, self.bot_username.as_deref());
        info!(
            "[{}] {} ({}): {} -> {}",
            event.chat_kind.as_str(),
            filter::chat_display_name(&event),
            event.chat_id,
            filter::sender_display_name(event.sender.as_ref()),
            event.text.trim(),
        );

        self.dispatcher.route(Job {
            event,
            message,
            need_reply: addressed,
        })
    }

    /// One-off completion over `prompt` alone, sent as a new message.
    ///
    /// Bypasses the conversation pipeline: no history is read or written.
    pub async fn generate_and_send_message(
        &self,
        chat_id: ChatId,
        prompt: &str,
    ) -> Result<(), ChannelError> {
        let reply = self.assistant.complete(&[Message::user(prompt)]).await?;
        if reply.content().trim().is_empty() {
            warn!(%chat_id, "empty completion; operator message not sent");
            return Ok(());
        }
        self.sender.send(chat_id, reply.content()).await?;
        info!(%chat_id, "operator message sent");
        Ok(())
    }

    /// Stop routing and wait for every conversation worker to drain.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}
