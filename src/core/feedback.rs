//! # Feedback Tracker
//!
//! Holds the latest vote the user cast per persisted message. Votes are
//! optimistic: they are recorded here before the backend confirms anything and
//! are never rolled back if the submission fails. A failed submission is only
//! logged, so local state can drift from what the backend stored.
//!
//! The tracker outlives history reloads. When a reload brings back a message
//! whose persisted copy has no feedback yet, the local vote is re-applied.

use std::collections::HashMap;

use crate::core::message::{MessageId, Vote};

#[derive(Debug, Default, Clone)]
pub struct FeedbackTracker {
    votes: HashMap<MessageId, Vote>,
}

impl FeedbackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote. Last write wins; returns the vote it replaced.
    pub fn record(&mut self, id: MessageId, vote: Vote) -> Option<Vote> {
        self.votes.insert(id, vote)
    }

    pub fn latest(&self, id: MessageId) -> Option<Vote> {
        self.votes.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}
