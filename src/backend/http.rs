//! HTTP backend for the inference server.
//!
//! Endpoints:
//! - `GET /infer?prompt&session_id&max_tokens&temperature`: SSE stream of
//!   `{"token", "cached"}` payloads, closed by the server when done
//! - `GET /history/{session_id}`: persisted messages, oldest first
//! - `GET /sessions`: known sessions, newest first
//! - `GET /metrics`: diagnostics object
//! - `PUT /messages/{id}/feedback`: `{"vote": "up" | "down"}`

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::Url;
use tokio::sync::mpsc::Sender;

use super::provider::{Backend, BackendError};
use super::sse::{SseDecoder, SseEvent};
use super::types::{FeedbackBody, MessageRecord, SessionRecord, TokenEvent};
use crate::core::message::{Message, MessageId, Vote};
use crate::core::params::StreamRequest;
use crate::core::session::Session;

pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Config(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Config(format!(
                "base URL '{base_url}' cannot have paths"
            )));
        }
        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Config(format!("base URL '{}' cannot have paths", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, BackendError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }
}

/// Turns a non-success response into `BackendError::Api`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    warn!("Backend error: {} - {}", status, message);
    Err(BackendError::Api { status, message })
}

/// Decodes one SSE payload. Malformed payloads are dropped, not fatal.
fn decode_token(event: &SseEvent) -> Option<TokenEvent> {
    match serde_json::from_str::<TokenEvent>(&event.data) {
        Ok(token) if token.token.is_empty() => {
            debug!("Skipping empty token payload");
            None
        }
        Ok(token) => Some(token),
        Err(e) => {
            warn!("Dropping malformed stream payload ({}): {:?}", e, event.data);
            None
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_stream(
        &self,
        request: &StreamRequest,
        sender: Sender<TokenEvent>,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["infer"])?;
        info!(
            "Opening stream: session={}, prompt_len={}, max_tokens={}, temperature={}",
            request.session_id,
            request.prompt.len(),
            request.params.max_tokens,
            request.params.temperature
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("prompt", request.prompt.as_str()),
                ("session_id", request.session_id.as_str()),
            ])
            .query(&[("max_tokens", request.params.max_tokens)])
            .query(&[("temperature", request.params.temperature)])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        debug!("Stream response status: {}", response.status());
        let response = check_status(response).await?;

        let mut decoder = SseDecoder::new();
        let mut bytes = response.bytes_stream();
        let mut sent = 0usize;

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| BackendError::Disconnected(e.to_string()))?;
            debug!("Raw chunk received: {} bytes", chunk.len());
            for event in decoder.push(&chunk) {
                if let Some(token) = decode_token(&event) {
                    if sender.send(token).await.is_err() {
                        warn!("Token send failed: receiver dropped");
                        return Err(BackendError::ChannelClosed);
                    }
                    sent += 1;
                }
            }
        }

        if let Some(event) = decoder.finish()
            && let Some(token) = decode_token(&event)
        {
            if sender.send(token).await.is_err() {
                return Err(BackendError::ChannelClosed);
            }
            sent += 1;
        }

        info!("Stream closed by server after {} tokens", sent);
        Ok(())
    }

    async fn fetch_history(&self, session_id: &str) -> Result<Vec<Message>, BackendError> {
        let records: Vec<MessageRecord> = self.get_json(&["history", session_id]).await?;
        debug!("History for {}: {} records", session_id, records.len());
        Ok(records.into_iter().map(Message::from).collect())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, BackendError> {
        let records: Vec<SessionRecord> = self.get_json(&["sessions"]).await?;
        Ok(records.into_iter().map(Session::from).collect())
    }

    async fn fetch_metrics(&self) -> Result<serde_json::Value, BackendError> {
        self.get_json(&["metrics"]).await
    }

    async fn submit_feedback(
        &self,
        message_id: MessageId,
        vote: Vote,
    ) -> Result<(), BackendError> {
        let id = message_id.to_string();
        let url = self.endpoint(&["messages", id.as_str(), "feedback"])?;
        debug!("PUT {} vote={:?}", url, vote);
        let response = self
            .client
            .put(url)
            .json(&FeedbackBody { vote })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_and_encodes() {
        let backend = HttpBackend::new("http://localhost:8000/api/").unwrap();
        let url = backend.endpoint(&["history", "session a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/history/session%20a%2Fb");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(BackendError::Config(_))
        ));
        assert!(matches!(
            HttpBackend::new("mailto:someone@example.com"),
            Err(BackendError::Config(_))
        ));
    }

    #[test]
    fn test_decode_token_drops_malformed() {
        let ok = SseEvent {
            event: None,
            data: r#"{"token":"a","cached":true}"#.to_string(),
        };
        let bad = SseEvent {
            event: None,
            data: "{not json".to_string(),
        };
        assert_eq!(
            decode_token(&ok),
            Some(TokenEvent {
                token: "a".to_string(),
                cached: true
            })
        );
        assert_eq!(decode_token(&bad), None);
    }
}
