use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};

use lyoha_core::config::{AgentConfig, EmptyReplyPolicy, DEFAULT_REQUEST_TIMEOUT_SECS};
use lyoha_core::types::Message;

use crate::prompt::system_prompt;
use crate::provider::{ChatRequest, LlmProvider, ProviderError};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("completion failed: {0}")]
    CompletionFailed(#[from] ProviderError),
}

/// Turns an ordered window of messages into exactly one assistant reply.
///
/// Implementations hold no per-conversation state, so one instance is shared
/// by every conversation worker.
#[async_trait]
pub trait ChatAssistant: Send + Sync {
    /// Name used in log fields.
    fn name(&self) -> &str;

    /// Issue one completion over `messages`. The returned message has the
    /// assistant role. Never retries.
    async fn complete(&self, messages: &[Message]) -> Result<Message, AssistantError>;
}

/// [`ChatAssistant`] backed by a remote [`LlmProvider`].
pub struct CompletionAssistant {
    provider: Box<dyn LlmProvider>,
    model: String,
    system: String,
    timeout: Duration,
    empty_reply: EmptyReplyPolicy,
}

impl CompletionAssistant {
    pub fn new(provider: Box<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system: system_prompt(None),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            empty_reply: EmptyReplyPolicy::default(),
        }
    }

    pub fn from_config(provider: Box<dyn LlmProvider>, config: &AgentConfig) -> Self {
        Self::new(provider, config.model.clone())
            .with_system_prompt(system_prompt(config.system_prompt.as_deref()))
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .with_empty_reply_policy(config.empty_reply)
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_empty_reply_policy(mut self, policy: EmptyReplyPolicy) -> Self {
        self.empty_reply = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatAssistant for CompletionAssistant {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn complete(&self, messages: &[Message]) -> Result<Message, AssistantError> {
        let req = ChatRequest {
            model: self.model.clone(),
            system: self.system.clone(),
            messages: messages.to_vec(),
        };

        let started = Instant::now();
        let resp = match tokio::time::timeout(self.timeout, self.provider.send(&req)).await {
            Ok(result) => result?,
            Err(_) => {
                let ms = self.timeout.as_millis() as u64;
                warn!(provider = %self.provider.name(), ms, "completion timed out");
                return Err(ProviderError::Timeout { ms }.into());
            }
        };

        info!(
            provider = %self.provider.name(),
            model = %resp.model,
            turns = req.messages.len(),
            tokens_in = resp.tokens_in,
            tokens_out = resp.tokens_out,
            latency_ms = started.elapsed().as_millis() as u64,
            "completion finished"
        );

        if resp.content.is_empty() && self.empty_reply == EmptyReplyPolicy::Reject {
            return Err(ProviderError::EmptyResponse.into());
        }

        Ok(Message::assistant(resp.content))
    }
}
