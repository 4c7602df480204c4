//! # Application State
//!
//! Core business state for Pocket. Domain logic only; presentation state
//! lives in the `tui` module.
//!
//! ```text
//! App
//! ├── sessions: SessionRegistry      // known sessions + active one
//! ├── history: HistoryStore          // persisted history cache + reload generations
//! ├── conversation: Conversation     // displayed list (persisted + provisional)
//! ├── feedback: FeedbackTracker      // latest local vote per message
//! ├── stream: Option<ActiveStream>   // the one handle whose events are honoured
//! ├── params: GenerationParams       // max tokens / temperature
//! ├── status_message: String         // status bar text
//! ├── error: Option<String>          // recoverable error shown to the user
//! └── metrics: Option<Value>         // backend diagnostics, passed through as-is
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use crate::core::action::StreamHandle;
use crate::core::conversation::Conversation;
use crate::core::feedback::FeedbackTracker;
use crate::core::history::HistoryStore;
use crate::core::message::SessionId;
use crate::core::params::GenerationParams;
use crate::core::session::SessionRegistry;

/// The stream the reducer currently listens to.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStream {
    pub handle: StreamHandle,
    pub session_id: SessionId,
    /// Fragments applied so far.
    pub fragments: usize,
    /// True once any fragment came from the backend's response cache.
    pub cached: bool,
}

pub struct App {
    pub sessions: SessionRegistry,
    pub history: HistoryStore,
    pub conversation: Conversation,
    pub feedback: FeedbackTracker,
    pub stream: Option<ActiveStream>,
    pub params: GenerationParams,
    pub status_message: String,
    pub error: Option<String>,
    pub metrics: Option<serde_json::Value>,
    last_handle: u64,
}

impl App {
    pub fn new(params: GenerationParams) -> Self {
        Self::with_sessions(SessionRegistry::new(), params)
    }

    /// Starts on an existing session instead of a fresh one.
    pub fn resuming(session_id: SessionId, params: GenerationParams) -> Self {
        Self::with_sessions(SessionRegistry::with_active(session_id), params)
    }

    fn with_sessions(sessions: SessionRegistry, params: GenerationParams) -> Self {
        Self {
            sessions,
            history: HistoryStore::new(),
            conversation: Conversation::new(),
            feedback: FeedbackTracker::new(),
            stream: None,
            params,
            status_message: String::from("Welcome to Pocket!"),
            error: None,
            metrics: None,
            last_handle: 0,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Allocates the next stream handle. Handles are never reused.
    pub(crate) fn next_handle(&mut self) -> StreamHandle {
        self.last_handle += 1;
        StreamHandle(self.last_handle)
    }
}
