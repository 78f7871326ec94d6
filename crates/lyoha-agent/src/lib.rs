//! Completion side of the bot: the LLM provider seam, the stateless
//! [`CompletionAssistant`] and the per-conversation [`ContextualAssistant`].

pub mod assistant;
pub mod context;
pub mod openai;
pub mod prompt;
pub mod provider;

pub use assistant::{AssistantError, ChatAssistant, CompletionAssistant};
pub use context::{BoundedContext, ContextualAssistant};
pub use provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
