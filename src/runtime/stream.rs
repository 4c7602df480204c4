//! # Stream Controller
//!
//! Owns at most one live reply stream. Each stream runs as two tasks:
//!
//! ```text
//! producer:  backend.open_stream() ──TokenEvent──▶ forwarder
//!                    │                                 │
//!                    └──── outcome (oneshot) ─────────▶│
//!                                                      ▼
//!                                  Action::Stream(StreamEvent { handle, .. })
//! ```
//!
//! The forwarder holds the stream's [`StreamSession`] behind a mutex and only
//! emits an event while the session is still open. `cancel()` flips the session
//! to `Cancelled` under the same lock, so once it returns no further event for
//! that handle can be sent, however long the transport takes to close.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use crate::backend::{Backend, BackendError, TokenEvent};
use crate::core::action::{Action, StreamEvent, StreamEventKind, StreamHandle, StreamSummary};
use crate::core::message::SessionId;
use crate::core::params::{ParamsError, StreamRequest};

/// Buffered tokens between the producer and the forwarder.
const TOKEN_BUFFER: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    EmptyPrompt,
    InvalidParams(ParamsError),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::EmptyPrompt => write!(f, "prompt is empty"),
            StreamError::InvalidParams(e) => write!(f, "invalid parameters: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Open,
    Completed,
    Errored,
    Cancelled,
}

impl StreamStatus {
    pub fn is_terminal(self) -> bool {
        self != StreamStatus::Open
    }
}

/// One stream's accumulated state.
///
/// `Open → (token)* → Completed | Errored | Cancelled`. Every transition out of
/// a terminal state is refused and reported as `false`.
#[derive(Debug, Clone)]
pub struct StreamSession {
    session_id: SessionId,
    text: String,
    fragments: usize,
    cached: bool,
    status: StreamStatus,
}

impl StreamSession {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            text: String::new(),
            fragments: 0,
            cached: false,
            status: StreamStatus::Open,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            fragments: self.fragments,
            cached: self.cached,
        }
    }

    pub fn push_token(&mut self, fragment: &str, cached: bool) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
        self.cached |= cached;
        true
    }

    pub fn complete(&mut self) -> bool {
        self.finish(StreamStatus::Completed)
    }

    pub fn fail(&mut self) -> bool {
        self.finish(StreamStatus::Errored)
    }

    pub fn cancel(&mut self) -> bool {
        self.finish(StreamStatus::Cancelled)
    }

    fn finish(&mut self, status: StreamStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}

type SharedSession = Arc<Mutex<StreamSession>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, StreamSession> {
    // A panicked forwarder must not wedge cancellation.
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Releases a subscription's tasks when dropped, on every exit path.
struct SubscriptionGuard {
    handle: StreamHandle,
    session: SharedSession,
    tasks: Vec<AbortHandle>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let cancelled = lock(&self.session).cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if cancelled {
            info!("Stream {} cancelled", self.handle);
        } else {
            debug!("Stream {} released", self.handle);
        }
    }
}

pub struct StreamController {
    backend: Arc<dyn Backend>,
    events: UnboundedSender<Action>,
    active: Option<SubscriptionGuard>,
}

impl StreamController {
    pub fn new(backend: Arc<dyn Backend>, events: UnboundedSender<Action>) -> Self {
        Self {
            backend,
            events,
            active: None,
        }
    }

    pub fn active_handle(&self) -> Option<StreamHandle> {
        self.active.as_ref().map(|guard| guard.handle)
    }

    /// Snapshot of the active stream's session.
    pub fn active_session(&self) -> Option<StreamSession> {
        self.active.as_ref().map(|guard| lock(&guard.session).clone())
    }

    /// Opens a stream under `handle`, terminating any stream already open.
    pub fn start(
        &mut self,
        handle: StreamHandle,
        request: StreamRequest,
    ) -> Result<StreamHandle, StreamError> {
        if request.prompt.trim().is_empty() {
            return Err(StreamError::EmptyPrompt);
        }
        request.params.validate().map_err(StreamError::InvalidParams)?;

        if let Some(previous) = self.active.take() {
            debug!("Stream {} superseded by {}", previous.handle, handle);
        }

        info!(
            "Starting stream {} on session {} via {}",
            handle,
            request.session_id,
            self.backend.name()
        );

        let session: SharedSession = Arc::new(Mutex::new(StreamSession::new(
            request.session_id.clone(),
        )));
        let (token_tx, token_rx) = mpsc::channel::<TokenEvent>(TOKEN_BUFFER);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let backend = self.backend.clone();
        let producer = tokio::spawn(async move {
            let outcome = backend.open_stream(&request, token_tx).await;
            // The forwarder may already be gone after a cancel
            let _ = outcome_tx.send(outcome);
        });

        let forwarder = tokio::spawn(forward(
            handle,
            session.clone(),
            token_rx,
            outcome_rx,
            self.events.clone(),
        ));

        self.active = Some(SubscriptionGuard {
            handle,
            session,
            tasks: vec![producer.abort_handle(), forwarder.abort_handle()],
        });
        Ok(handle)
    }

    /// Terminates the stream immediately. Returns false if `handle` isn't the
    /// active stream.
    pub fn cancel(&mut self, handle: StreamHandle) -> bool {
        if self.active_handle() != Some(handle) {
            debug!("Cancel for inactive stream {} ignored", handle);
            return false;
        }
        self.active = None;
        true
    }

    /// Drops bookkeeping for a stream that reached a terminal event.
    pub fn release(&mut self, handle: StreamHandle) {
        if self.active_handle() == Some(handle) {
            self.active = None;
        }
    }
}

/// Sends `kind` if the session accepts `transition`, holding the lock across
/// both so cancellation can't interleave.
fn emit(
    handle: StreamHandle,
    session: &SharedSession,
    events: &UnboundedSender<Action>,
    transition: impl FnOnce(&mut StreamSession) -> Option<StreamEventKind>,
) -> bool {
    let mut session = lock(session);
    let Some(kind) = transition(&mut session) else {
        return false;
    };
    if events
        .send(Action::Stream(StreamEvent { handle, kind }))
        .is_err()
    {
        warn!("Stream {} event dropped: receiver gone", handle);
        return false;
    }
    true
}

async fn forward(
    handle: StreamHandle,
    session: SharedSession,
    mut tokens: mpsc::Receiver<TokenEvent>,
    outcome: oneshot::Receiver<Result<(), BackendError>>,
    events: UnboundedSender<Action>,
) {
    while let Some(token) = tokens.recv().await {
        let sent = emit(handle, &session, &events, |s| {
            s.push_token(&token.token, token.cached)
                .then(|| StreamEventKind::Token {
                    text: token.token.clone(),
                    cached: token.cached,
                })
        });
        if !sent {
            return;
        }
    }

    let Ok(outcome) = outcome.await else {
        debug!("Stream {} producer ended without an outcome", handle);
        return;
    };

    match outcome {
        Ok(()) => {
            emit(handle, &session, &events, |s| {
                s.complete().then(|| StreamEventKind::Completed(s.summary()))
            });
        }
        Err(BackendError::Disconnected(cause)) => {
            // No resume semantics on the server, so a drop ends the reply
            warn!("Stream {} disconnected, treating as complete: {}", handle, cause);
            emit(handle, &session, &events, |s| {
                s.complete().then(|| StreamEventKind::Completed(s.summary()))
            });
        }
        Err(BackendError::ChannelClosed) => {
            debug!("Stream {} token channel closed", handle);
        }
        Err(e) => {
            emit(handle, &session, &events, |s| {
                s.fail().then(|| StreamEventKind::Errored(e.to_string()))
            });
        }
    }
}
