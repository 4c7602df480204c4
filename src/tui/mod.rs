//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and translates keyboard events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! While a reply streams the loop polls every ~80ms so the spinner moves;
//! otherwise it sleeps up to 250ms and only redraws on input or when a
//! background action arrives.

mod component;
mod components;
mod event;
mod ui;

use log::info;
use std::io::stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;

use crate::backend::HttpBackend;
use crate::core::action::Action;
use crate::core::config::ResolvedConfig;
use crate::core::params::GenerationParams;
use crate::core::state::App;
use crate::runtime::Runtime;
use crate::tui::component::EventHandler;
use crate::tui::components::{InputBox, InputEvent, MessageList, MessageListState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const MAX_TOKENS_STEP: i64 = 10;
const TEMPERATURE_STEP: f64 = 0.1;

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
}

impl TuiState {
    pub fn new(params: GenerationParams) -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(params),
        }
    }

    /// Maps one terminal event to a core action, handling view-only events
    /// (editing, scrolling) in place.
    pub fn action_for(&mut self, event: TuiEvent, app: &App) -> Option<Action> {
        match event {
            TuiEvent::ForceQuit => Some(Action::Quit),
            TuiEvent::Escape => {
                if app.metrics.is_some() {
                    Some(Action::DismissMetrics)
                } else if app.is_streaming() {
                    Some(Action::CancelGeneration)
                } else if app.error.is_some() {
                    Some(Action::DismissError)
                } else {
                    None
                }
            }
            TuiEvent::NewSession => {
                self.message_list = MessageListState::new();
                Some(Action::NewSession)
            }
            TuiEvent::NextSession | TuiEvent::PrevSession => {
                let offset = if event == TuiEvent::NextSession { 1 } else { -1 };
                let next = app.sessions.neighbor(offset)?;
                self.message_list = MessageListState::new();
                Some(Action::ActivateSession(next.id.clone()))
            }
            TuiEvent::VoteUp | TuiEvent::VoteDown => {
                let message_id = app.conversation.last_votable()?.id?;
                let vote = if event == TuiEvent::VoteUp {
                    crate::core::message::Vote::Up
                } else {
                    crate::core::message::Vote::Down
                };
                Some(Action::Vote { message_id, vote })
            }
            TuiEvent::RefreshSessions => Some(Action::RefreshSessions),
            TuiEvent::ToggleMetrics => Some(if app.metrics.is_some() {
                Action::DismissMetrics
            } else {
                Action::RequestMetrics
            }),
            TuiEvent::MaxTokensDown => Some(Action::SetParams(
                app.params.step_max_tokens(-MAX_TOKENS_STEP),
            )),
            TuiEvent::MaxTokensUp => Some(Action::SetParams(
                app.params.step_max_tokens(MAX_TOKENS_STEP),
            )),
            TuiEvent::TemperatureDown => Some(Action::SetParams(
                app.params.step_temperature(-TEMPERATURE_STEP),
            )),
            TuiEvent::TemperatureUp => Some(Action::SetParams(
                app.params.step_temperature(TEMPERATURE_STEP),
            )),
            TuiEvent::ScrollUp
            | TuiEvent::ScrollDown
            | TuiEvent::ScrollPageUp
            | TuiEvent::ScrollPageDown => {
                MessageList {
                    conversation: &app.conversation,
                    streaming: app.is_streaming(),
                    state: &mut self.message_list,
                }
                .handle_event(&event);
                None
            }
            TuiEvent::Resize => None,
            _ => match self.input_box.handle_event(&event)? {
                InputEvent::Submit(text) => {
                    self.message_list.stick_to_bottom = true;
                    Some(Action::Submit(text))
                }
                InputEvent::ContentChanged => None,
            },
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock, // Non-blinking: avoids blink timer reset from continuous redraws
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), DisableMouseCapture, DisableBracketedPaste);
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let backend = HttpBackend::new(&config.api_base)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let app = match config.initial_session {
        Some(id) => App::resuming(id, config.params),
        None => App::new(config.params),
    };
    let mut runtime = Runtime::new(app, Arc::new(backend));
    let mut tui = TuiState::new(config.params);

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    runtime.startup();

    let start_time = Instant::now();
    let mut needs_redraw = true;

    'main: loop {
        let streaming = runtime.app.is_streaming();
        if needs_redraw || streaming {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &runtime.app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let timeout = if streaming {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(250)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Drain all pending input before the next draw
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if let Some(action) = tui.action_for(event, &runtime.app)
                && !runtime.dispatch(action)
            {
                break 'main;
            }
        }

        // Background results (stream events, reloads, votes)
        while let Some(action) = runtime.try_next() {
            needs_redraw = true;
            if !runtime.dispatch(action) {
                break 'main;
            }
        }
    }

    info!("Pocket shutting down");
    ratatui::restore();
    Ok(())
}
