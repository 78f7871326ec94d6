//! Rolling conversation memory.
//!
//! [`BoundedContext`] is a fixed-capacity FIFO window of messages.
//! [`ContextualAssistant`] owns one window and decides, per batch of incoming
//! messages, whether the shared [`ChatAssistant`] is consulted at all.

use std::collections::VecDeque;
use std::sync::Arc;

use lyoha_core::error::{LyohaError, Result};
use lyoha_core::types::Message;

use crate::assistant::{AssistantError, ChatAssistant};

/// Ordered window of at most `capacity` messages. The oldest entry is evicted
/// when a push would exceed the capacity.
#[derive(Debug, Clone)]
pub struct BoundedContext {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl BoundedContext {
    /// Fails with `InvalidConfiguration` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(LyohaError::InvalidConfiguration(
                "context capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        })
    }

    pub fn push(&mut self, msg: Message) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    pub fn extend<I: IntoIterator<Item = Message>>(&mut self, msgs: I) {
        for msg in msgs {
            self.push(msg);
        }
    }

    /// Owned copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A [`ChatAssistant`] with memory of one conversation.
pub struct ContextualAssistant {
    assistant: Arc<dyn ChatAssistant>,
    context: BoundedContext,
}

impl ContextualAssistant {
    pub fn new(assistant: Arc<dyn ChatAssistant>, capacity: usize) -> Result<Self> {
        Ok(Self {
            assistant,
            context: BoundedContext::new(capacity)?,
        })
    }

    /// Record `incoming` and, when `need_reply` is set, produce one reply.
    ///
    /// Incoming messages are recorded before the completion call and stay
    /// recorded when it fails. A successful reply is recorded as well.
    pub async fn process(
        &mut self,
        incoming: &[Message],
        need_reply: bool,
    ) -> std::result::Result<Option<Message>, AssistantError> {
        self.context.extend(incoming.iter().cloned());

        if !need_reply {
            return Ok(None);
        }

        let reply = self.assistant.complete(&self.context.snapshot()).await?;
        self.context.push(reply.clone());
        Ok(Some(reply))
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.context.snapshot()
    }

    pub fn clear(&mut self) {
        self.context.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the window size and keeps every window it was called with.
    #[derive(Default)]
    struct Recorder {
        windows: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl ChatAssistant for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        async fn complete(&self, messages: &[Message]) -> std::result::Result<Message, AssistantError> {
            self.windows.lock().unwrap().push(messages.to_vec());
            Ok(Message::assistant(format!("seen {}", messages.len())))
        }
    }

    struct Broken;

    #[async_trait]
    impl ChatAssistant for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn complete(&self, _messages: &[Message]) -> std::result::Result<Message, AssistantError> {
            Err(ProviderError::Unavailable("down".to_string()).into())
        }
    }

    fn users(range: std::ops::Range<usize>) -> Vec<Message> {
        range.map(|i| Message::user(format!("m{i}"))).collect()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            BoundedContext::new(0),
            Err(LyohaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn keeps_last_n_in_push_order() {
        let mut ctx = BoundedContext::new(3).unwrap();
        ctx.extend(users(0..7));
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.snapshot(), users(4..7));
    }

    #[test]
    fn under_capacity_keeps_everything() {
        let mut ctx = BoundedContext::new(10).unwrap();
        ctx.extend(users(0..4));
        assert_eq!(ctx.snapshot(), users(0..4));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut ctx = BoundedContext::new(2).unwrap();
        ctx.push(Message::user("a"));
        let before = ctx.snapshot();
        ctx.push(Message::user("b"));
        ctx.push(Message::user("c"));
        assert_eq!(before, vec![Message::user("a")]);
    }

    #[test]
    fn clear_empties_window() {
        let mut ctx = BoundedContext::new(2).unwrap();
        ctx.extend(users(0..2));
        ctx.clear();
        assert!(ctx.is_empty());
        assert_eq!(ctx.capacity(), 2);
    }

    #[tokio::test]
    async fn no_reply_records_without_calling_backend() {
        let backend = Arc::new(Recorder::default());
        let mut assistant = ContextualAssistant::new(backend.clone(), 10).unwrap();

        let out = assistant.process(&users(0..2), false).await.unwrap();

        assert!(out.is_none());
        assert!(backend.windows.lock().unwrap().is_empty());
        assert_eq!(assistant.snapshot(), users(0..2));
    }

    #[tokio::test]
    async fn reply_sees_new_messages_and_is_recorded() {
        let backend = Arc::new(Recorder::default());
        let mut assistant = ContextualAssistant::new(backend.clone(), 10).unwrap();

        assistant.process(&users(0..1), false).await.unwrap();
        let reply = assistant.process(&users(1..2), true).await.unwrap().unwrap();

        let windows = backend.windows.lock().unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0], users(0..2));

        let snapshot = assistant.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.last(), Some(&reply));
        assert_eq!(reply.content(), "seen 2");
    }

    #[tokio::test]
    async fn reply_is_subject_to_eviction() {
        let backend = Arc::new(Recorder::default());
        let mut assistant = ContextualAssistant::new(backend, 2).unwrap();

        let reply = assistant.process(&users(0..2), true).await.unwrap().unwrap();
        assert_eq!(assistant.snapshot(), vec![Message::user("m1"), reply]);
    }

    #[tokio::test]
    async fn failed_completion_keeps_incoming() {
        let mut assistant = ContextualAssistant::new(Arc::new(Broken), 10).unwrap();

        let err = assistant.process(&users(0..1), true).await;

        assert!(err.is_err());
        assert_eq!(assistant.snapshot(), users(0..1));
    }
}
