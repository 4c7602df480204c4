//! # Runtime
//!
//! Runs the reducer and carries out its effects. All state mutation happens
//! on whichever task calls [`Runtime::dispatch`]; background work only ever
//! talks back by sending an `Action` into the runtime's channel.
//!
//! ```text
//!   user input ──┐
//!                ▼
//!   channel ──▶ dispatch() ──▶ update(&mut App) ──▶ Vec<Effect> ──▶ execute()
//!      ▲                                                              │
//!      └─────────── stream events, history, sessions, metrics ◀───────┘
//! ```

pub mod stream;

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::backend::Backend;
use crate::core::action::{Action, Effect, StreamEvent, StreamEventKind, update};
use crate::core::state::App;

pub use stream::{StreamController, StreamError, StreamSession, StreamStatus};

pub struct Runtime {
    pub app: App,
    backend: Arc<dyn Backend>,
    controller: StreamController,
    tx: UnboundedSender<Action>,
    rx: UnboundedReceiver<Action>,
}

impl Runtime {
    pub fn new(app: App, backend: Arc<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = StreamController::new(backend.clone(), tx.clone());
        Self {
            app,
            backend,
            controller,
            tx,
            rx,
        }
    }

    /// A handle for feeding actions in from elsewhere.
    pub fn sender(&self) -> UnboundedSender<Action> {
        self.tx.clone()
    }

    /// Loads the session list and the active session's history.
    pub fn startup(&mut self) {
        self.dispatch(Action::RefreshSessions);
        let active = self.app.sessions.active_id().to_string();
        self.dispatch(Action::ActivateSession(active));
    }

    /// Applies one action and runs its effects. Returns false once the app
    /// should quit.
    pub fn dispatch(&mut self, action: Action) -> bool {
        if let Action::Stream(event) = &action
            && event.is_terminal()
        {
            self.controller.release(event.handle);
        }

        let mut running = true;
        for effect in update(&mut self.app, action) {
            running &= self.execute(effect);
        }
        running
    }

    /// Next queued background action, without waiting.
    pub fn try_next(&mut self) -> Option<Action> {
        self.rx.try_recv().ok()
    }

    /// Waits for the next background action.
    pub async fn next_action(&mut self) -> Option<Action> {
        self.rx.recv().await
    }

    fn execute(&mut self, effect: Effect) -> bool {
        debug!("Executing effect: {:?}", effect);
        match effect {
            Effect::Quit => return false,
            Effect::OpenStream { handle, request } => {
                if let Err(e) = self.controller.start(handle, request) {
                    warn!("Stream {} not started: {}", handle, e);
                    self.send(Action::Stream(StreamEvent {
                        handle,
                        kind: StreamEventKind::Errored(e.to_string()),
                    }));
                }
            }
            Effect::CancelStream(handle) => {
                self.controller.cancel(handle);
            }
            Effect::LoadHistory {
                session_id,
                generation,
            } => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend
                        .fetch_history(&session_id)
                        .await
                        .map_err(|e| e.to_string());
                    send_or_warn(
                        &tx,
                        Action::HistoryLoaded {
                            session_id,
                            generation,
                            result,
                        },
                    );
                });
            }
            Effect::LoadSessions => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.list_sessions().await.map_err(|e| e.to_string());
                    send_or_warn(&tx, Action::SessionsLoaded(result));
                });
            }
            Effect::SubmitFeedback { message_id, vote } => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend
                        .submit_feedback(message_id, vote)
                        .await
                        .map_err(|e| e.to_string());
                    send_or_warn(&tx, Action::FeedbackSubmitted { message_id, result });
                });
            }
            Effect::LoadMetrics => {
                let backend = self.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.fetch_metrics().await.map_err(|e| e.to_string());
                    send_or_warn(&tx, Action::MetricsLoaded(result));
                });
            }
        }
        true
    }

    fn send(&self, action: Action) {
        send_or_warn(&self.tx, action);
    }
}

fn send_or_warn(tx: &UnboundedSender<Action>, action: Action) {
    if tx.send(action).is_err() {
        warn!("Failed to send action: receiver dropped");
    }
}
