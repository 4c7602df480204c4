//! # Messages
//!
//! Domain types for conversation content. These are what the reducer and the
//! view layer work with; the wire records in `backend::types` translate into them.
//!
//! ```text
//! Message
//! ├── id: Option<MessageId>   // None while only held client-side
//! ├── role: Role              // user | assistant
//! ├── content: String
//! ├── timestamp: Option<String>
//! └── feedback: Feedback      // none | approved | rejected
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque session identifier (client-generated or reported by the backend).
pub type SessionId = String;

/// Identifier the backend assigns to a persisted message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single approval vote, as sent to the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

/// Feedback state attached to a displayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    None,
    Approved,
    Rejected,
}

impl Feedback {
    pub fn is_none(self) -> bool {
        self == Feedback::None
    }
}

impl From<Vote> for Feedback {
    fn from(vote: Vote) -> Self {
        match vote {
            Vote::Up => Feedback::Approved,
            Vote::Down => Feedback::Rejected,
        }
    }
}

impl From<Option<Vote>> for Feedback {
    fn from(vote: Option<Vote>) -> Self {
        vote.map(Feedback::from).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Option<MessageId>,
    pub role: Role,
    pub content: String,
    pub timestamp: Option<String>,
    pub feedback: Feedback,
}

impl Message {
    /// A client-side message without a persisted id.
    pub fn provisional(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            timestamp: None,
            feedback: Feedback::None,
        }
    }

    /// A message as the backend reports it.
    pub fn persisted(id: u64, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Some(MessageId(id)),
            ..Self::provisional(role, content)
        }
    }

    pub fn with_feedback(mut self, feedback: Feedback) -> Self {
        self.feedback = feedback;
        self
    }
}
