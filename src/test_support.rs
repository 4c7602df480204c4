//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::backend::{Backend, BackendError, TokenEvent};
use crate::core::message::{Message, MessageId, Vote};
use crate::core::params::StreamRequest;
use crate::core::session::Session;

/// How a scripted stream ends after its tokens are sent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StreamEnd {
    #[default]
    Complete,
    /// Transport drops mid-stream.
    Disconnect,
    /// Server rejects the request before any token.
    Status(u16),
}

/// An in-memory backend that replays a fixed script.
#[derive(Default)]
pub struct ScriptedBackend {
    pub tokens: Vec<String>,
    pub cached: bool,
    /// Pause before each token, so tests can cancel mid-stream.
    pub delay: Option<Duration>,
    pub end: StreamEnd,
    pub history: HashMap<String, Vec<Message>>,
    pub fail_history: bool,
    pub fail_feedback: bool,
    pub sessions: Vec<Session>,
    pub requests: Mutex<Vec<StreamRequest>>,
    pub feedback: Mutex<Vec<(MessageId, Vote)>>,
}

impl ScriptedBackend {
    pub fn streaming(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn ending(mut self, end: StreamEnd) -> Self {
        self.end = end;
        self
    }

    pub fn with_history(mut self, session_id: &str, messages: Vec<Message>) -> Self {
        self.history.insert(session_id.to_string(), messages);
        self
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open_stream(
        &self,
        request: &StreamRequest,
        sender: Sender<TokenEvent>,
    ) -> Result<(), BackendError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let StreamEnd::Status(status) = self.end {
            return Err(BackendError::Api {
                status,
                message: "scripted failure".to_string(),
            });
        }
        for token in &self.tokens {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let event = TokenEvent {
                token: token.clone(),
                cached: self.cached,
            };
            sender
                .send(event)
                .await
                .map_err(|_| BackendError::ChannelClosed)?;
        }
        match self.end {
            StreamEnd::Disconnect => Err(BackendError::Disconnected("connection reset".to_string())),
            _ => Ok(()),
        }
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>, BackendError> {
        if self.fail_history {
            return Err(BackendError::Api {
                status: 503,
                message: "history unavailable".to_string(),
            });
        }
        Ok(self.history.get(session_id).cloned().unwrap_or_default())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, BackendError> {
        Ok(self.sessions.clone())
    }

    async fn fetch_metrics(&self) -> Result<serde_json::Value, BackendError> {
        Ok(serde_json::json!({ "total_requests": self.requests.lock().map(|r| r.len()).unwrap_or(0) }))
    }

    async fn submit_feedback(
        &self,
        message_id: MessageId,
        vote: Vote,
    ) -> Result<(), BackendError> {
        if let Ok(mut feedback) = self.feedback.lock() {
            feedback.push((message_id, vote));
        }
        if self.fail_feedback {
            return Err(BackendError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}
