//! Per-conversation dispatcher.
//!
//! Each conversation gets one unbounded mailbox and one worker task, created
//! lazily on its first message. The worker owns that conversation's
//! [`ContextualAssistant`] and drains the mailbox strictly in arrival order,
//! so no lock is needed around the context. Conversations run independently of
//! each other; a failure inside one worker is logged and never leaves it.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use lyoha_agent::{BoundedContext, ChatAssistant, ContextualAssistant};
use lyoha_core::types::{ChatId, Message};

use crate::error::ChannelError;
use crate::sender::MessageSender;
use crate::types::IncomingEvent;

/// One unit of work for a conversation worker.
#[derive(Debug, Clone)]
pub struct Job {
    /// Original event, kept for the reply thread.
    pub event: IncomingEvent,
    /// Message recorded into the conversation context.
    pub message: Message,
    /// Whether the assistant should answer.
    pub need_reply: bool,
}

struct Worker {
    tx: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<()>,
}

/// Routes jobs to per-conversation workers.
pub struct Dispatcher {
    bot_name: String,
    context_size: usize,
    assistant: Arc<dyn ChatAssistant>,
    sender: Arc<dyn MessageSender>,
    workers: DashMap<ChatId, Worker>,
    /// Cleared by `shutdown` under the write lock, so no worker can be
    /// created after the drain.
    open: RwLock<bool>,
}

impl Dispatcher {
    /// Fails with `InvalidConfiguration` when `context_size` is zero.
    pub fn new(
        bot_name: impl Into<String>,
        context_size: usize,
        assistant: Arc<dyn ChatAssistant>,
        sender: Arc<dyn MessageSender>,
    ) -> lyoha_core::Result<Self> {
        BoundedContext::new(context_size)?;
        Ok(Self {
            bot_name: bot_name.into(),
            context_size,
            assistant,
            sender,
            workers: DashMap::new(),
            open: RwLock::new(true),
        })
    }

    /// Enqueue `job` on its conversation's mailbox, spawning the worker on
    /// first use. Never waits for the worker.
    pub fn route(&self, job: Job) -> Result<(), ChannelError> {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        if !*open {
            return Err(ChannelError::DispatcherClosed);
        }

        let chat_id = job.event.chat_id;
        let tx = match self.workers.entry(chat_id) {
            Entry::Occupied(entry) => entry.get().tx.clone(),
            Entry::Vacant(entry) => {
                let worker = self.spawn_worker(chat_id)?;
                let tx = worker.tx.clone();
                entry.insert(worker);
                tx
            }
        };

        tx.send(job).map_err(|_| ChannelError::DispatcherClosed)
    }

    /// Number of conversations with a live worker.
    pub fn active_conversations(&self) -> usize {
        self.workers.len()
    }

    pub fn is_closed(&self) -> bool {
        !*self.open.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop accepting jobs, let every worker drain its mailbox, then join them.
    pub async fn shutdown(&self) {
        let workers: Vec<(ChatId, Worker)> = {
            let mut open = self.open.write().unwrap_or_else(PoisonError::into_inner);
            *open = false;
            let ids: Vec<ChatId> = self.workers.iter().map(|e| *e.key()).collect();
            ids.into_iter()
                .filter_map(|id| self.workers.remove(&id))
                .collect()
        };

        info!(workers = workers.len(), "dispatcher shutting down");

        for (chat_id, worker) in workers {
            // Dropping the sender ends the worker loop once the queue is empty.
            drop(worker.tx);
            if let Err(e) = worker.handle.await {
                warn!(%chat_id, error = %e, "conversation worker ended abnormally");
            }
        }
    }

    fn spawn_worker(&self, chat_id: ChatId) -> Result<Worker, ChannelError> {
        let assistant = ContextualAssistant::new(Arc::clone(&self.assistant), self.context_size)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(
            chat_id,
            rx,
            assistant,
            Arc::clone(&self.sender),
            self.bot_name.clone(),
        ));
        debug!(%chat_id, "conversation worker spawned");
        Ok(Worker { tx, handle })
    }
}

async fn run_worker(
    chat_id: ChatId,
    mut rx: mpsc::UnboundedReceiver<Job>,
    mut assistant: ContextualAssistant,
    sender: Arc<dyn MessageSender>,
    bot_name: String,
) {
    while let Some(job) = rx.recv().await {
        let outcome = AssertUnwindSafe(handle_job(
            chat_id,
            job,
            &mut assistant,
            sender.as_ref(),
            &bot_name,
        ))
        .catch_unwind()
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%chat_id, error = %e, "handler error in chat"),
            Err(_) => error!(%chat_id, "handler panicked; worker continues with next message"),
        }
    }
    debug!(%chat_id, "conversation worker stopped");
}

async fn handle_job(
    chat_id: ChatId,
    job: Job,
    assistant: &mut ContextualAssistant,
    sender: &dyn MessageSender,
    bot_name: &str,
) -> Result<(), ChannelError> {
    let started = Instant::now();
    let reply = assistant
        .process(std::slice::from_ref(&job.message), job.need_reply)
        .await?;

    let Some(reply) = reply else {
        return Ok(());
    };

    let elapsed = started.elapsed();
    debug!(%chat_id, elapsed_ms = elapsed.as_millis() as u64, "reply ready");
    let text = format_reply(bot_name, elapsed, reply.content());
    sender.reply(chat_id, &text, job.event.message_id).await
}

/// Banner line, elapsed seconds with two decimals, then the reply text.
pub fn format_reply(bot_name: &str, elapsed: Duration, content: &str) -> String {
    format!(
        "[{bot_name} 💬🤖🔥]\n{:.2} sec elapsed\n{content}",
        elapsed.as_secs_f64()
    )
}
