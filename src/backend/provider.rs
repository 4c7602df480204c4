use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use super::types::TokenEvent;
use crate::core::message::{Message, MessageId, Vote};
use crate::core::params::StreamRequest;
use crate::core::session::Session;

/// Errors that can occur while talking to the inference server.
#[derive(Debug)]
pub enum BackendError {
    /// Backend misconfigured (bad base URL). Not retryable.
    Config(String),
    /// Could not reach the server (timeout, DNS, connection refused).
    Network(String),
    /// The transport dropped after the stream was established.
    Disconnected(String),
    /// Server returned a non-success status.
    Api { status: u16, message: String },
    /// Failed to parse the server's response.
    Parse(String),
    /// The receiving side of the token channel was dropped.
    ChannelClosed,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Config(msg) => write!(f, "config error: {msg}"),
            BackendError::Network(msg) => write!(f, "network error: {msg}"),
            BackendError::Disconnected(msg) => write!(f, "stream disconnected: {msg}"),
            BackendError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            BackendError::Parse(msg) => write!(f, "parse error: {msg}"),
            BackendError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for BackendError {}

/// The inference server as seen by the client core.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns the name of the backend, for logs.
    fn name(&self) -> &str;

    /// Opens a reply stream, sending each decoded payload to `sender` in
    /// arrival order. Returns once the server closes the stream.
    async fn open_stream(
        &self,
        request: &StreamRequest,
        sender: Sender<TokenEvent>,
    ) -> Result<(), BackendError>;

    /// Persisted history of one session, oldest first.
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>, BackendError>;

    async fn list_sessions(&self) -> Result<Vec<Session>, BackendError>;

    /// Opaque diagnostics object; never interpreted by the client.
    async fn fetch_metrics(&self) -> Result<serde_json::Value, BackendError>;

    async fn submit_feedback(&self, message_id: MessageId, vote: Vote)
    -> Result<(), BackendError>;
}
