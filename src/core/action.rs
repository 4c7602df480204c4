//! # Actions
//!
//! Everything that can happen in Pocket becomes an `Action`.
//! User presses Enter? That's `Action::Submit`.
//! A token arrives? That's `Action::Stream(StreamEvent { kind: Token, .. })`.
//!
//! The `update()` function applies one action to the state and returns the
//! effects the runtime should perform. No I/O happens here.
//!
//! ```text
//! State + Action  →  update()  →  New State + Vec<Effect>
//! ```
//!
//! Each call is one indivisible step, so an event can never observe a
//! half-applied transition. Stream events carry the handle of the stream that
//! produced them; events whose handle is no longer the active one are dropped.

use std::fmt;

use log::{debug, info, warn};

use crate::core::conversation::Conversation;
use crate::core::message::{Message, MessageId, SessionId, Vote};
use crate::core::params::{GenerationParams, StreamRequest};
use crate::core::session::Session;
use crate::core::state::{ActiveStream, App};

/// Identifies one stream subscription. Monotonic, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamHandle(pub u64);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-stream totals reported on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    pub fragments: usize,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEventKind {
    Token { text: String, cached: bool },
    Completed(StreamSummary),
    Errored(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub handle: StreamHandle,
    pub kind: StreamEventKind,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, StreamEventKind::Token { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // User intents
    Submit(String),
    CancelGeneration,
    NewSession,
    ActivateSession(SessionId),
    RefreshSessions,
    Vote { message_id: MessageId, vote: Vote },
    SetParams(GenerationParams),
    RequestMetrics,
    DismissMetrics,
    DismissError,
    Quit,

    // Results of background work
    Stream(StreamEvent),
    HistoryLoaded {
        session_id: SessionId,
        generation: u64,
        result: Result<Vec<Message>, String>,
    },
    SessionsLoaded(Result<Vec<Session>, String>),
    MetricsLoaded(Result<serde_json::Value, String>),
    FeedbackSubmitted {
        message_id: MessageId,
        result: Result<(), String>,
    },
}

/// I/O the runtime performs on the reducer's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenStream {
        handle: StreamHandle,
        request: StreamRequest,
    },
    CancelStream(StreamHandle),
    LoadHistory {
        session_id: SessionId,
        generation: u64,
    },
    LoadSessions,
    SubmitFeedback {
        message_id: MessageId,
        vote: Vote,
    },
    LoadMetrics,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Vec<Effect> {
    match action {
        Action::Submit(text) => submit(app, text),
        Action::CancelGeneration => cancel_generation(app),
        Action::NewSession => new_session(app),
        Action::ActivateSession(id) => activate_session(app, id),
        Action::RefreshSessions => vec![Effect::LoadSessions],
        Action::Vote { message_id, vote } => apply_vote(app, message_id, vote),
        Action::SetParams(params) => set_params(app, params),
        Action::RequestMetrics => vec![Effect::LoadMetrics],
        Action::DismissMetrics => {
            app.metrics = None;
            vec![]
        }
        Action::DismissError => {
            app.error = None;
            vec![]
        }
        Action::Quit => {
            let mut effects: Vec<Effect> = abandon_stream(app).into_iter().collect();
            effects.push(Effect::Quit);
            effects
        }
        Action::Stream(event) => stream_event(app, event),
        Action::HistoryLoaded {
            session_id,
            generation,
            result,
        } => history_loaded(app, session_id, generation, result),
        Action::SessionsLoaded(result) => {
            match result {
                Ok(sessions) => {
                    debug!("Session list refreshed: {} sessions", sessions.len());
                    app.sessions.replace(sessions);
                }
                Err(e) => {
                    warn!("Failed to list sessions: {}", e);
                    app.error = Some(format!("Could not load sessions: {e}"));
                }
            }
            vec![]
        }
        Action::MetricsLoaded(result) => {
            match result {
                Ok(metrics) => app.metrics = Some(metrics),
                Err(e) => {
                    warn!("Failed to load metrics: {}", e);
                    app.error = Some(format!("Could not load metrics: {e}"));
                }
            }
            vec![]
        }
        Action::FeedbackSubmitted { message_id, result } => {
            // Best effort: the optimistic vote stands either way.
            match result {
                Ok(()) => debug!("Feedback for message {} accepted", message_id),
                Err(e) => warn!("Feedback for message {} failed: {}", message_id, e),
            }
            vec![]
        }
    }
}

/// Stops listening to the active stream, if any, and returns the cancel effect.
fn abandon_stream(app: &mut App) -> Option<Effect> {
    let active = app.stream.take()?;
    info!(
        "Abandoning stream {} for session {}",
        active.handle, active.session_id
    );
    Some(Effect::CancelStream(active.handle))
}

fn submit(app: &mut App, text: String) -> Vec<Effect> {
    if text.trim().is_empty() {
        debug!("Ignoring empty submission");
        return vec![];
    }

    // The previous stream must stop counting before anything else changes.
    // Only its own unfinished reply goes; finished replies stay until a reload.
    let mut effects = Vec::new();
    if let Some(cancel) = abandon_stream(app) {
        effects.push(cancel);
        if let Some(stale) = app.conversation.discard_draft() {
            debug!("Dropped unfinished reply ({} bytes)", stale.content.len());
        }
    }

    app.conversation.push_user(text.clone());

    let session_id = app.sessions.active_id().to_string();
    let handle = app.next_handle();
    app.stream = Some(ActiveStream {
        handle,
        session_id: session_id.clone(),
        fragments: 0,
        cached: false,
    });
    app.error = None;
    app.status_message = String::from("Generating...");
    info!("Submitting prompt on session {} as stream {}", session_id, handle);

    effects.push(Effect::OpenStream {
        handle,
        request: StreamRequest {
            prompt: text,
            session_id,
            params: app.params,
        },
    });
    effects
}

fn cancel_generation(app: &mut App) -> Vec<Effect> {
    let Some(cancel) = abandon_stream(app) else {
        return vec![];
    };
    app.conversation.settle_draft();
    app.status_message = String::from("Generation cancelled");
    let session_id = app.sessions.active_id().to_string();
    let generation = app.history.request(&session_id);
    vec![
        cancel,
        Effect::LoadHistory {
            session_id,
            generation,
        },
    ]
}

fn new_session(app: &mut App) -> Vec<Effect> {
    let effects: Vec<Effect> = abandon_stream(app).into_iter().collect();
    let id = app.sessions.create().id.clone();
    app.conversation = Conversation::new();
    app.history.supersede();
    app.status_message = String::from("New chat");
    info!("Created session {}", id);
    effects
}

fn activate_session(app: &mut App, id: SessionId) -> Vec<Effect> {
    if !app.sessions.activate(&id) {
        // Already active: refresh unless a stream is still writing to it.
        if app.is_streaming() {
            return vec![];
        }
        let generation = app.history.request(&id);
        return vec![Effect::LoadHistory {
            session_id: id,
            generation,
        }];
    }

    let mut effects: Vec<Effect> = match app.stream.as_ref() {
        Some(active) if active.session_id != id => abandon_stream(app).into_iter().collect(),
        _ => vec![],
    };

    // Show what we already know while the reload is in flight.
    app.conversation = Conversation::from_history(app.history.cached(&id), &app.feedback);
    app.status_message = format!("Session {}", app.sessions.active().title);
    info!("Activated session {}", id);

    let generation = app.history.request(&id);
    effects.push(Effect::LoadHistory {
        session_id: id,
        generation,
    });
    effects
}

fn apply_vote(app: &mut App, message_id: MessageId, vote: Vote) -> Vec<Effect> {
    if !app.conversation.contains_persisted(message_id) {
        warn!("Rejected vote on message {}: not a persisted message", message_id);
        app.status_message = String::from("Only saved replies can be rated");
        return vec![];
    }
    app.feedback.record(message_id, vote);
    app.conversation.apply_feedback(message_id, vote);
    app.status_message = match vote {
        Vote::Up => String::from("Marked as good response"),
        Vote::Down => String::from("Marked as bad response"),
    };
    vec![Effect::SubmitFeedback { message_id, vote }]
}

fn set_params(app: &mut App, params: GenerationParams) -> Vec<Effect> {
    match params.validate() {
        Ok(()) => {
            app.params = params;
            app.status_message = format!(
                "Max tokens {} | Temp {:.1}",
                params.max_tokens, params.temperature
            );
        }
        Err(e) => {
            warn!("Rejected generation params: {}", e);
            app.status_message = format!("Invalid parameters: {e}");
        }
    }
    vec![]
}

fn stream_event(app: &mut App, event: StreamEvent) -> Vec<Effect> {
    let Some(active) = app.stream.as_mut().filter(|s| s.handle == event.handle) else {
        debug!("Discarding event from stale stream {}", event.handle);
        return vec![];
    };

    match event.kind {
        StreamEventKind::Token { text, cached } => {
            active.fragments += 1;
            active.cached |= cached;
            app.conversation.append_token(&text);
            vec![]
        }
        StreamEventKind::Completed(summary) => {
            app.stream = None;
            app.conversation.settle_draft();
            app.status_message = if summary.cached {
                format!("Reply complete ({} fragments, cached)", summary.fragments)
            } else {
                format!("Reply complete ({} fragments)", summary.fragments)
            };
            info!("Stream {} completed: {:?}", event.handle, summary);
            let session_id = app.sessions.active_id().to_string();
            let generation = app.history.request(&session_id);
            vec![
                Effect::LoadHistory {
                    session_id,
                    generation,
                },
                Effect::LoadSessions,
            ]
        }
        StreamEventKind::Errored(cause) => {
            app.stream = None;
            app.conversation.settle_draft();
            warn!("Stream {} failed: {}", event.handle, cause);
            app.error = Some(format!("Stream failed: {cause}"));
            app.status_message = String::from("Reply interrupted");
            let session_id = app.sessions.active_id().to_string();
            let generation = app.history.request(&session_id);
            vec![Effect::LoadHistory {
                session_id,
                generation,
            }]
        }
    }
}

fn history_loaded(
    app: &mut App,
    session_id: SessionId,
    generation: u64,
    result: Result<Vec<Message>, String>,
) -> Vec<Effect> {
    match result {
        Ok(messages) => {
            let count = messages.len();
            if !app.history.accept(&session_id, generation, messages) {
                debug!(
                    "Discarding stale history for {} (generation {})",
                    session_id, generation
                );
                return vec![];
            }
            if session_id == app.sessions.active_id() && !app.is_streaming() {
                app.conversation
                    .replace_with_history(app.history.cached(&session_id), &app.feedback);
                debug!("History for {} applied: {} messages", session_id, count);
            }
        }
        Err(e) => {
            if app.history.fail(&session_id, generation) {
                warn!("Failed to load history for {}: {}", session_id, e);
                app.error = Some(format!("Could not load history: {e}"));
            } else {
                debug!("Ignoring stale history failure for {}", session_id);
            }
        }
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{Feedback, Role};

    fn app_on(session: &str) -> App {
        App::resuming(session.to_string(), GenerationParams::default())
    }

    fn token(handle: StreamHandle, text: &str) -> Action {
        Action::Stream(StreamEvent {
            handle,
            kind: StreamEventKind::Token {
                text: text.to_string(),
                cached: false,
            },
        })
    }

    fn completed(handle: StreamHandle, fragments: usize) -> Action {
        Action::Stream(StreamEvent {
            handle,
            kind: StreamEventKind::Completed(StreamSummary {
                fragments,
                cached: false,
            }),
        })
    }

    fn errored(handle: StreamHandle) -> Action {
        Action::Stream(StreamEvent {
            handle,
            kind: StreamEventKind::Errored("connection reset".to_string()),
        })
    }

    /// Submits and returns the handle of the stream it opened.
    fn submit_prompt(app: &mut App, text: &str) -> StreamHandle {
        let effects = update(app, Action::Submit(text.to_string()));
        effects
            .iter()
            .find_map(|e| match e {
                Effect::OpenStream { handle, .. } => Some(*handle),
                _ => None,
            })
            .expect("submit should open a stream")
    }

    fn history_generation(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::LoadHistory { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("expected a history reload")
    }

    fn contents(app: &App) -> Vec<String> {
        app.conversation.messages().map(|m| m.content.clone()).collect()
    }

    #[test]
    fn test_hello_scenario_streams_then_reconciles() {
        let mut app = app_on("A");
        app.params = GenerationParams::new(100, 0.7).unwrap();

        let effects = update(&mut app, Action::Submit("Hello".to_string()));
        let Some(Effect::OpenStream { handle, request }) = effects.last() else {
            panic!("expected OpenStream, got {:?}", effects);
        };
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.session_id, "A");
        assert_eq!(request.params.max_tokens, 100);
        let handle = *handle;

        // Placeholder is created lazily
        assert_eq!(contents(&app), vec!["Hello"]);

        for fragment in ["Hi", " there", "!"] {
            assert!(update(&mut app, token(handle, fragment)).is_empty());
        }
        assert_eq!(contents(&app), vec!["Hello", "Hi there!"]);
        assert!(app.conversation.check_invariants().is_ok());

        let effects = update(&mut app, completed(handle, 3));
        assert!(effects.contains(&Effect::LoadSessions));
        let generation = history_generation(&effects);
        assert!(!app.is_streaming());

        let persisted = vec![
            Message::persisted(1, Role::User, "Hello"),
            Message::persisted(2, Role::Assistant, "Hi there!"),
        ];
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(persisted.clone()),
            },
        );
        let shown: Vec<Message> = app.conversation.messages().cloned().collect();
        assert_eq!(shown, persisted);
        assert!(!app.conversation.has_provisional());
    }

    #[test]
    fn test_error_with_nothing_persisted_drops_partial_reply() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "Hello");
        update(&mut app, token(handle, "Par"));
        update(&mut app, token(handle, "t"));
        assert_eq!(contents(&app), vec!["Hello", "Part"]);

        let effects = update(&mut app, errored(handle));
        assert!(app.error.is_some());
        let generation = history_generation(&effects);

        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(vec![]),
            },
        );
        assert!(app.conversation.is_empty());
    }

    #[test]
    fn test_resubmit_cancels_previous_and_ignores_late_tokens() {
        let mut app = app_on("A");
        let first = submit_prompt(&mut app, "one");
        update(&mut app, token(first, "par"));

        let effects = update(&mut app, Action::Submit("two".to_string()));
        assert_eq!(effects[0], Effect::CancelStream(first));
        let second = match &effects[1] {
            Effect::OpenStream { handle, .. } => *handle,
            other => panic!("expected OpenStream, got {:?}", other),
        };
        assert_ne!(first, second);

        // Late delivery from the cancelled stream is ignored
        update(&mut app, token(first, "tial"));
        update(&mut app, completed(first, 2));
        assert!(app.is_streaming());

        update(&mut app, token(second, "fresh"));
        assert_eq!(contents(&app), vec!["one", "two", "fresh"]);
        assert!(app.conversation.check_invariants().is_ok());
    }

    #[test]
    fn test_empty_prompt_is_ignored() {
        let mut app = app_on("A");
        assert!(update(&mut app, Action::Submit("   \n".to_string())).is_empty());
        assert!(app.conversation.is_empty());
        assert!(!app.is_streaming());
    }

    #[test]
    fn test_history_load_is_idempotent() {
        let mut app = app_on("A");
        let persisted = vec![
            Message::persisted(1, Role::User, "q"),
            Message::persisted(2, Role::Assistant, "a"),
        ];
        let mut snapshots = Vec::new();
        for _ in 0..2 {
            let effects = update(&mut app, Action::ActivateSession("A".to_string()));
            let generation = history_generation(&effects);
            update(
                &mut app,
                Action::HistoryLoaded {
                    session_id: "A".to_string(),
                    generation,
                    result: Ok(persisted.clone()),
                },
            );
            snapshots.push(app.conversation.clone());
        }
        assert_eq!(snapshots[0], snapshots[1]);
        assert_eq!(snapshots[0].len(), 2);
    }

    #[test]
    fn test_history_failure_keeps_current_list() {
        let mut app = app_on("A");
        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        let generation = history_generation(&effects);
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(vec![Message::persisted(1, Role::User, "kept")]),
            },
        );

        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        let generation = history_generation(&effects);
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Err("503".to_string()),
            },
        );
        assert_eq!(contents(&app), vec!["kept"]);
        assert!(app.error.as_deref().unwrap().contains("503"));
    }

    #[test]
    fn test_switching_away_and_back_restores_persisted_history() {
        let mut app = app_on("A");
        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        let generation = history_generation(&effects);
        let persisted_a = vec![
            Message::persisted(1, Role::User, "q"),
            Message::persisted(2, Role::Assistant, "a"),
        ];
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(persisted_a.clone()),
            },
        );

        // Start streaming on A, then leave mid-stream
        let handle = submit_prompt(&mut app, "more");
        update(&mut app, token(handle, "half"));
        let effects = update(&mut app, Action::ActivateSession("B".to_string()));
        assert_eq!(effects[0], Effect::CancelStream(handle));
        assert!(app.conversation.is_empty());

        // B gets a provisional message of its own
        let b_handle = submit_prompt(&mut app, "on b");
        update(&mut app, token(b_handle, "b reply"));

        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        assert_eq!(effects[0], Effect::CancelStream(b_handle));
        let shown: Vec<Message> = app.conversation.messages().cloned().collect();
        assert_eq!(shown, persisted_a);

        // Stale events from either stream change nothing
        update(&mut app, token(handle, "late"));
        update(&mut app, token(b_handle, "late"));
        let shown: Vec<Message> = app.conversation.messages().cloned().collect();
        assert_eq!(shown, persisted_a);

        let generation = history_generation(&effects);
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(persisted_a.clone()),
            },
        );
        let shown: Vec<Message> = app.conversation.messages().cloned().collect();
        assert_eq!(shown, persisted_a);
    }

    #[test]
    fn test_history_for_left_session_is_discarded() {
        let mut app = app_on("A");
        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        let generation = history_generation(&effects);
        update(&mut app, Action::ActivateSession("B".to_string()));
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(vec![Message::persisted(1, Role::User, "from A")]),
            },
        );
        assert!(app.conversation.is_empty());
        assert!(app.history.cached("A").is_empty());
    }

    #[test]
    fn test_history_arriving_mid_stream_is_not_applied() {
        let mut app = app_on("A");
        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        let generation = history_generation(&effects);
        let handle = submit_prompt(&mut app, "q");
        update(&mut app, token(handle, "a"));
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(vec![]),
            },
        );
        assert_eq!(contents(&app), vec!["q", "a"]);
    }

    #[test]
    fn test_vote_on_provisional_message_is_rejected() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "q");
        update(&mut app, token(handle, "a"));
        let effects = update(
            &mut app,
            Action::Vote {
                message_id: MessageId(1),
                vote: Vote::Up,
            },
        );
        assert!(effects.is_empty());
        assert!(app.feedback.is_empty());
        assert!(app.conversation.messages().all(|m| m.feedback.is_none()));
    }

    #[test]
    fn test_vote_is_optimistic_and_survives_reload() {
        let mut app = app_on("A");
        let persisted = vec![
            Message::persisted(1, Role::User, "q"),
            Message::persisted(2, Role::Assistant, "a"),
        ];
        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation: history_generation(&effects),
                result: Ok(persisted.clone()),
            },
        );

        let effects = update(
            &mut app,
            Action::Vote {
                message_id: MessageId(2),
                vote: Vote::Up,
            },
        );
        assert_eq!(
            effects,
            vec![Effect::SubmitFeedback {
                message_id: MessageId(2),
                vote: Vote::Up,
            }]
        );
        assert_eq!(
            app.conversation.entries()[1].message().feedback,
            Feedback::Approved
        );

        // Backend failure doesn't roll back
        update(
            &mut app,
            Action::FeedbackSubmitted {
                message_id: MessageId(2),
                result: Err("500".to_string()),
            },
        );
        assert!(app.error.is_none());

        // Reload whose copy lacks feedback keeps the local vote
        let effects = update(&mut app, Action::ActivateSession("A".to_string()));
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation: history_generation(&effects),
                result: Ok(persisted),
            },
        );
        assert_eq!(
            app.conversation.entries()[1].message().feedback,
            Feedback::Approved
        );
    }

    #[test]
    fn test_cancel_generation_reloads() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "q");
        let effects = update(&mut app, Action::CancelGeneration);
        assert_eq!(effects[0], Effect::CancelStream(handle));
        assert!(matches!(effects[1], Effect::LoadHistory { .. }));
        assert!(!app.is_streaming());
        assert!(update(&mut app, Action::CancelGeneration).is_empty());
    }

    #[test]
    fn test_new_session_cancels_and_clears() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "q");
        let effects = update(&mut app, Action::NewSession);
        assert_eq!(effects, vec![Effect::CancelStream(handle)]);
        assert_ne!(app.sessions.active_id(), "A");
        assert!(app.conversation.is_empty());
    }

    #[test]
    fn test_completed_reply_kept_when_next_prompt_beats_reload() {
        let mut app = app_on("A");
        let first = submit_prompt(&mut app, "Hello");
        for fragment in ["Hi", " there", "!"] {
            update(&mut app, token(first, fragment));
        }
        let effects = update(&mut app, completed(first, 3));
        let generation = history_generation(&effects);

        let second = submit_prompt(&mut app, "Again");
        assert_eq!(contents(&app), vec!["Hello", "Hi there!", "Again"]);
        assert!(app.conversation.check_invariants().is_ok());

        // The reload from the first completion lands mid-stream: cached, not shown
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation,
                result: Ok(vec![
                    Message::persisted(1, Role::User, "Hello"),
                    Message::persisted(2, Role::Assistant, "Hi there!"),
                ]),
            },
        );
        assert_eq!(app.history.cached("A").len(), 2);
        assert_eq!(contents(&app), vec!["Hello", "Hi there!", "Again"]);

        update(&mut app, token(second, "Sure"));
        assert_eq!(contents(&app), vec!["Hello", "Hi there!", "Again", "Sure"]);
        assert!(app.conversation.check_invariants().is_ok());
    }

    #[test]
    fn test_partial_reply_kept_when_reload_fails() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "q1");
        update(&mut app, token(handle, "partial"));
        let effects = update(&mut app, errored(handle));
        update(
            &mut app,
            Action::HistoryLoaded {
                session_id: "A".to_string(),
                generation: history_generation(&effects),
                result: Err("offline".to_string()),
            },
        );
        assert_eq!(contents(&app), vec!["q1", "partial"]);

        let next = submit_prompt(&mut app, "q2");
        update(&mut app, token(next, "r2"));
        assert_eq!(contents(&app), vec!["q1", "partial", "q2", "r2"]);
        assert!(app.conversation.check_invariants().is_ok());
    }

    #[test]
    fn test_cancelled_reply_stays_until_reload() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "q1");
        update(&mut app, token(handle, "half"));
        update(&mut app, Action::CancelGeneration);
        assert!(app.conversation.draft().is_none());

        submit_prompt(&mut app, "q2");
        assert_eq!(contents(&app), vec!["q1", "half", "q2"]);
    }

    #[test]
    fn test_set_params_rejects_invalid() {
        let mut app = app_on("A");
        update(
            &mut app,
            Action::SetParams(GenerationParams {
                max_tokens: 0,
                temperature: 0.5,
            }),
        );
        assert_eq!(app.params, GenerationParams::default());

        let params = GenerationParams::new(50, 0.2).unwrap();
        update(&mut app, Action::SetParams(params));
        assert_eq!(app.params, params);
    }

    #[test]
    fn test_quit_cancels_active_stream() {
        let mut app = app_on("A");
        let handle = submit_prompt(&mut app, "q");
        let effects = update(&mut app, Action::Quit);
        assert_eq!(effects, vec![Effect::CancelStream(handle), Effect::Quit]);
    }

    #[test]
    fn test_sessions_and_metrics_results() {
        let mut app = app_on("A");
        update(
            &mut app,
            Action::SessionsLoaded(Ok(vec![Session {
                id: "A".to_string(),
                title: "Hello...".to_string(),
                created_at: String::new(),
            }])),
        );
        assert_eq!(app.sessions.active().title, "Hello...");

        update(
            &mut app,
            Action::MetricsLoaded(Ok(serde_json::json!({"cache_hits": 3}))),
        );
        assert_eq!(app.metrics.as_ref().unwrap()["cache_hits"], 3);
        update(&mut app, Action::DismissMetrics);
        assert!(app.metrics.is_none());

        update(&mut app, Action::SessionsLoaded(Err("down".to_string())));
        assert_eq!(app.sessions.sessions().len(), 1);
        assert!(app.error.is_some());
    }
}
