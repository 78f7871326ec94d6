//! Conversation allow-list.
//!
//! Open-by-default: an empty list means every conversation is eligible.
//! Once at least one ID is present, only listed conversations are.

use dashmap::DashSet;

use lyoha_core::types::ChatId;

/// Process-wide set of allowed conversation IDs, safe to mutate while events
/// are being filtered.
#[derive(Debug, Default)]
pub struct AllowList {
    ids: DashSet<ChatId>,
}

impl AllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = ChatId>>(ids: I) -> Self {
        let list = Self::new();
        for id in ids {
            list.ids.insert(id);
        }
        list
    }

    /// Add `id`. Returns `false` if it was already present.
    pub fn allow(&self, id: ChatId) -> bool {
        self.ids.insert(id)
    }

    /// Remove `id`. Returns `false` if it was not present.
    pub fn disallow(&self, id: ChatId) -> bool {
        self.ids.remove(&id).is_some()
    }

    /// Returns `true` when events from `id` may be processed.
    pub fn is_allowed(&self, id: ChatId) -> bool {
        self.ids.is_empty() || self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Sorted copy of the current members.
    pub fn snapshot(&self) -> Vec<ChatId> {
        let mut ids: Vec<ChatId> = self.ids.iter().map(|id| *id).collect();
        ids.sort();
        ids
    }
}
