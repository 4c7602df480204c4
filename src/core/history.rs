//! # History Store
//!
//! Last known persisted history per session, and bookkeeping for in-flight
//! reloads.
//!
//! Every reload request gets a generation number. Only the response to the
//! newest request is accepted; anything older, or for a session that has since
//! been left, is stale and dropped. Starting a new session supersedes
//! outstanding reloads outright.

use std::collections::HashMap;

use crate::core::message::{Message, SessionId};

#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    cache: HashMap<SessionId, Vec<Message>>,
    generation: u64,
    pending: Option<(SessionId, u64)>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reload for `session_id` and returns its generation.
    pub fn request(&mut self, session_id: &str) -> u64 {
        self.generation += 1;
        self.pending = Some((session_id.to_string(), self.generation));
        self.generation
    }

    /// Invalidates any outstanding reload.
    pub fn supersede(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn is_current(&self, session_id: &str, generation: u64) -> bool {
        matches!(&self.pending, Some((id, g)) if id == session_id && *g == generation)
    }

    /// Stores a reload result if it answers the newest request.
    /// Returns false for stale responses, which leave the cache untouched.
    pub fn accept(&mut self, session_id: &str, generation: u64, messages: Vec<Message>) -> bool {
        if !self.is_current(session_id, generation) {
            return false;
        }
        self.pending = None;
        self.cache.insert(session_id.to_string(), messages);
        true
    }

    /// Settles a failed reload. Returns true if the failure answers the newest
    /// request (and so should be surfaced). The cache is never cleared.
    pub fn fail(&mut self, session_id: &str, generation: u64) -> bool {
        if !self.is_current(session_id, generation) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Last persisted history for `session_id` (empty if never loaded).
    pub fn cached(&self, session_id: &str) -> &[Message] {
        self.cache.get(session_id).map(Vec::as_slice).unwrap_or(&[])
    }
}
