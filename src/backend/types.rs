//! Wire records exchanged with the inference server, and their translation
//! into domain types.

use serde::{Deserialize, Serialize};

use crate::core::message::{Feedback, Message, MessageId, Role, Vote};
use crate::core::session::{Session, UNTITLED};

/// One pushed stream payload: `{"token": "...", "cached": false}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TokenEvent {
    pub token: String,
    /// True when the server answered from its response cache.
    #[serde(default)]
    pub cached: bool,
}

/// A persisted message as returned by `GET /history/{session_id}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MessageRecord {
    #[serde(default)]
    pub id: Option<MessageId>,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub feedback: Option<Vote>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: record.id,
            role: record.role,
            content: record.content,
            timestamp: record.timestamp,
            feedback: Feedback::from(record.feedback),
        }
    }
}

/// A session as listed by `GET /sessions`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "created_at")]
    pub date: Option<String>,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session {
            id: record.id,
            title: record
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            created_at: record.date.unwrap_or_default(),
        }
    }
}

/// Body of `PUT /messages/{id}/feedback`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct FeedbackBody {
    pub vote: Vote,
}
