//! # Conversation
//!
//! The displayed message list for the active session, kept as a sequence of
//! tagged entries rather than bare messages:
//!
//! ```text
//! [ Persisted(user) , Persisted(assistant) , Provisional(user) , Draft(assistant) ]
//!   └──────── from the backend ─────────┘   └────────── client-side only ─────────┘
//! ```
//!
//! Provisional entries are never merged with persisted ones. A history reload
//! replaces the whole list with the backend's copy, which is how provisional
//! entries turn into persisted ones.
//!
//! A `Draft` is the reply a live stream is still growing. When its stream ends
//! it is settled into an ordinary provisional entry and stays on screen until
//! the next reload.
//!
//! Invariant: at most one draft exists, and when it does it is the last entry.

use crate::core::feedback::FeedbackTracker;
use crate::core::message::{Feedback, Message, MessageId, Role, Vote};

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Confirmed by the backend.
    Persisted(Message),
    /// Held only in client memory until the next reload.
    Provisional(Message),
    /// Reply still being streamed; tokens grow it.
    Draft(Message),
}

impl Entry {
    pub fn message(&self) -> &Message {
        match self {
            Entry::Persisted(msg) | Entry::Provisional(msg) | Entry::Draft(msg) => msg,
        }
    }

    fn into_message(self) -> Message {
        match self {
            Entry::Persisted(msg) | Entry::Provisional(msg) | Entry::Draft(msg) => msg,
        }
    }

    /// Anything not yet confirmed by the backend, drafts included.
    pub fn is_provisional(&self) -> bool {
        !matches!(self, Entry::Persisted(_))
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Entry::Draft(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    entries: Vec<Entry>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from persisted history, re-applying local votes where the
    /// persisted copy carries none.
    pub fn from_history(history: &[Message], feedback: &FeedbackTracker) -> Self {
        let mut conversation = Self::new();
        conversation.replace_with_history(history, feedback);
        conversation
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().map(Entry::message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a provisional user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        debug_assert!(self.draft().is_none(), "user message appended after a live draft");
        self.entries
            .push(Entry::Provisional(Message::provisional(Role::User, content)));
    }

    /// Grows the draft reply, creating it on the first fragment.
    ///
    /// Replace-last-if-draft, else append. Never inserts mid-list.
    pub fn append_token(&mut self, fragment: &str) {
        if let Some(Entry::Draft(msg)) = self.entries.last_mut() {
            msg.content.push_str(fragment);
            return;
        }

        self.entries.push(Entry::Draft(Message::provisional(
            Role::Assistant,
            fragment,
        )));
    }

    /// The reply currently being streamed, if any.
    pub fn draft(&self) -> Option<&Message> {
        self.entries
            .last()
            .filter(|entry| entry.is_draft())
            .map(Entry::message)
    }

    /// Removes the draft reply of an abandoned stream.
    pub fn discard_draft(&mut self) -> Option<Message> {
        if self.entries.last().is_some_and(Entry::is_draft) {
            return self.entries.pop().map(Entry::into_message);
        }
        None
    }

    /// Freezes the draft of a finished stream. It stays provisional, but
    /// later tokens start a new reply instead of growing it.
    pub fn settle_draft(&mut self) -> bool {
        match self.entries.pop() {
            Some(Entry::Draft(msg)) => {
                self.entries.push(Entry::Provisional(msg));
                true
            }
            Some(other) => {
                self.entries.push(other);
                false
            }
            None => false,
        }
    }

    pub fn has_provisional(&self) -> bool {
        self.entries.iter().any(Entry::is_provisional)
    }

    /// Replaces every entry with the authoritative history.
    ///
    /// Persisted feedback wins; a local vote fills in only where the persisted
    /// copy has none. Applying the same history twice yields the same list.
    pub fn replace_with_history(&mut self, history: &[Message], feedback: &FeedbackTracker) {
        self.entries = history
            .iter()
            .map(|msg| {
                let mut msg = msg.clone();
                if msg.feedback.is_none()
                    && let Some(vote) = msg.id.and_then(|id| feedback.latest(id))
                {
                    msg.feedback = Feedback::from(vote);
                }
                Entry::Persisted(msg)
            })
            .collect();
    }

    /// Whether `id` names a persisted entry in this list.
    pub fn contains_persisted(&self, id: MessageId) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry, Entry::Persisted(msg) if msg.id == Some(id)))
    }

    /// Optimistically sets feedback on a persisted message.
    /// Returns false (and changes nothing) for unknown or provisional messages.
    pub fn apply_feedback(&mut self, id: MessageId, vote: Vote) -> bool {
        for entry in &mut self.entries {
            if let Entry::Persisted(msg) = entry
                && msg.id == Some(id)
            {
                msg.feedback = Feedback::from(vote);
                return true;
            }
        }
        false
    }

    /// The newest assistant reply that can receive feedback.
    pub fn last_votable(&self) -> Option<&Message> {
        self.entries.iter().rev().find_map(|entry| match entry {
            Entry::Persisted(msg) if msg.role == Role::Assistant && msg.id.is_some() => Some(msg),
            _ => None,
        })
    }

    /// Checks the draft invariant. Used by tests and debug assertions.
    pub fn check_invariants(&self) -> Result<(), String> {
        let drafts: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_draft())
            .map(|(idx, _)| idx)
            .collect();
        match drafts.as_slice() {
            [] => Ok(()),
            [idx] if *idx + 1 == self.entries.len() => Ok(()),
            [idx] => Err(format!("draft at index {idx} is not the last entry")),
            many => Err(format!("{} drafts", many.len())),
        }
    }
}
