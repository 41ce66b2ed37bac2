//! Ordered message log for the current session.

use chrono::Utc;

use agentdeck_client::types::{ChatMessage, MessageId, MessageRole};

/// Session id stamped on optimistic entries submitted before the backend has
/// materialized a session.
pub const PENDING_SESSION_ID: &str = "pending";

/// Exclusively owns the in-memory message sequence for the currently
/// selected session. Reconciliation has exactly one rule: the last
/// authoritative fetch wins wholesale over any optimistic state, so there is
/// no merge logic anywhere. Stale timelines are discarded on session switch,
/// never merged.
#[derive(Debug)]
pub struct MessageTimeline {
    entries: Vec<ChatMessage>,
    next_local_id: u64,
}

impl Default for MessageTimeline {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_local_id: 1,
        }
    }
}

impl MessageTimeline {
    #[must_use]
    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_local_entries(&self) -> bool {
        self.entries.iter().any(|message| message.id.is_local())
    }

    /// Appends a synthetic user message with a locally unique identifier and
    /// a client-side timestamp. The entry survives exactly until the next
    /// authoritative reconciliation.
    pub fn append_optimistic(&mut self, session_id: &str, content: &str) -> MessageId {
        let id = MessageId::Local(self.next_local_id);
        self.next_local_id = self.next_local_id.saturating_add(1);
        self.entries.push(ChatMessage {
            id,
            session_id: session_id.to_string(),
            role: MessageRole::User,
            content: content.to_string(),
            node: None,
            created_at: Utc::now(),
            meta: None,
        });
        id
    }

    /// Discards the whole in-memory sequence and installs the server's
    /// ordered sequence verbatim.
    pub fn replace_with_authoritative(&mut self, messages: Vec<ChatMessage>) {
        self.entries = messages;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
