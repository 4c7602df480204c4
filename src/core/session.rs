//! # Session Registry
//!
//! Known conversation sessions plus the one currently active.
//!
//! The list itself belongs to the backend; the registry only mirrors the last
//! successful `/sessions` response. A session created here stays local until
//! its first prompt is sent, at which point the backend starts reporting it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::core::message::SessionId;

/// Title shown for a session the backend hasn't named yet.
pub const UNTITLED: &str = "New chat";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    /// Creation time as reported by the backend (RFC 3339 for local sessions).
    pub created_at: String,
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates a process-unique session id: `session-<unix millis>-<counter>`.
///
/// The counter keeps ids distinct when several are created within one millisecond.
pub fn new_session_id() -> SessionId {
    let millis = Utc::now().timestamp_millis();
    let seq = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("session-{millis}-{seq}")
}

#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
    active: Session,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    /// Starts with a fresh local session active.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            active: local_session(new_session_id()),
        }
    }

    /// Starts with `id` active (e.g. resumed from the command line).
    pub fn with_active(id: SessionId) -> Self {
        Self {
            sessions: Vec::new(),
            active: local_session(id),
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn active_id(&self) -> &str {
        &self.active.id
    }

    pub fn active(&self) -> &Session {
        &self.active
    }

    /// Mirrors a fresh `/sessions` listing. The active session keeps its id;
    /// its title is refreshed if the backend now knows it.
    pub fn replace(&mut self, sessions: Vec<Session>) {
        if let Some(known) = sessions.iter().find(|s| s.id == self.active.id) {
            self.active = known.clone();
        }
        self.sessions = sessions;
    }

    /// Makes `id` active. Returns false if it already was.
    pub fn activate(&mut self, id: &str) -> bool {
        if self.active.id == id {
            return false;
        }
        self.active = self
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .unwrap_or_else(|| local_session(id.to_string()));
        true
    }

    /// Creates a new local session and makes it active.
    pub fn create(&mut self) -> &Session {
        self.active = local_session(new_session_id());
        &self.active
    }

    /// The listed session `offset` steps away from the active one, wrapping.
    /// If the active session isn't listed, stepping starts from the top.
    pub fn neighbor(&self, offset: isize) -> Option<&Session> {
        if self.sessions.is_empty() {
            return None;
        }
        let len = self.sessions.len() as isize;
        let next = match self.sessions.iter().position(|s| s.id == self.active.id) {
            Some(current) => (current as isize + offset).rem_euclid(len),
            None if offset >= 0 => 0,
            None => len - 1,
        };
        self.sessions.get(next as usize)
    }
}

fn local_session(id: SessionId) -> Session {
    Session {
        id,
        title: UNTITLED.to_string(),
        created_at: Utc::now().to_rfc3339(),
    }
}
