//! # MessageList Component
//!
//! Scrollable view of the active conversation.
//!
//! `MessageList` is created each frame from props (the conversation) and
//! wraps `&mut MessageListState`, which persists in `TuiState`. Heights are
//! measured during render, so scroll clamping always uses the last frame's
//! layout.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph, Wrap};

use crate::core::conversation::{Conversation, Entry};
use crate::core::message::{Feedback, Role};
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

const PAGE: u16 = 10;

/// Scroll state for the message list. Must be persisted in the parent TuiState.
#[derive(Debug, Clone)]
pub struct MessageListState {
    pub offset: u16,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    content_height: u16,
    viewport_height: u16,
}

impl Default for MessageListState {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListState {
    pub fn new() -> Self {
        Self {
            offset: 0,
            stick_to_bottom: true,
            content_height: 0,
            viewport_height: 0,
        }
    }

    fn max_offset(&self) -> u16 {
        self.content_height.saturating_sub(self.viewport_height)
    }

    fn scroll_up(&mut self, lines: u16) {
        self.offset = self.offset.saturating_sub(lines);
        self.stick_to_bottom = false;
    }

    /// Scrolling down past the end re-pins to the bottom.
    fn scroll_down(&mut self, lines: u16) {
        self.offset = self.offset.saturating_add(lines);
        if self.offset >= self.max_offset() {
            self.offset = self.max_offset();
            self.stick_to_bottom = true;
        }
    }

    fn settle(&mut self, content_height: u16, viewport_height: u16) {
        self.content_height = content_height;
        self.viewport_height = viewport_height;
        if self.stick_to_bottom || self.offset > self.max_offset() {
            self.offset = self.max_offset();
        }
    }
}

pub struct MessageList<'a> {
    pub conversation: &'a Conversation,
    pub streaming: bool,
    pub state: &'a mut MessageListState,
}

fn entry_lines(entry: &Entry, streaming_tail: bool) -> Vec<Line<'static>> {
    let message = entry.message();
    let color = match message.role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Green,
    };
    let mut header = vec![Span::styled(
        message.role.label(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    match message.feedback {
        Feedback::Approved => header.push(Span::styled(" ▲", Style::default().fg(Color::Green))),
        Feedback::Rejected => header.push(Span::styled(" ▼", Style::default().fg(Color::Red))),
        Feedback::None => {}
    }
    if streaming_tail {
        header.push(Span::styled(" …", Style::default().fg(Color::DarkGray)));
    } else if entry.is_provisional() {
        header.push(Span::styled(
            " (unsaved)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }

    let body_style = if entry.is_provisional() {
        Style::default().add_modifier(Modifier::DIM)
    } else {
        Style::default()
    };
    let mut lines = vec![Line::from(header)];
    lines.extend(
        message
            .content
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), body_style))),
    );
    lines.push(Line::default());
    lines
}

impl MessageList<'_> {
    fn lines(&self) -> Vec<Line<'static>> {
        let entries = self.conversation.entries();
        if entries.is_empty() {
            return vec![Line::from(Span::styled(
                "Type a prompt and press Enter.",
                Style::default().fg(Color::DarkGray),
            ))];
        }
        let last = entries.len() - 1;
        entries
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| {
                let tail = self.streaming && i == last && entry.is_draft();
                entry_lines(entry, tail)
            })
            .collect()
    }
}

impl Component for MessageList<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title("Conversation");
        let paragraph = Paragraph::new(self.lines()).wrap(Wrap { trim: false });

        let inner = block.inner(area);
        let height = paragraph.line_count(inner.width).min(u16::MAX as usize) as u16;
        self.state.settle(height, inner.height);

        frame.render_widget(paragraph.scroll((self.state.offset, 0)).block(block), area);
    }
}

impl EventHandler for MessageList<'_> {
    type Event = ();

    fn handle_event(&mut self, event: &TuiEvent) -> Option<()> {
        match event {
            TuiEvent::ScrollUp => self.state.scroll_up(1),
            TuiEvent::ScrollDown => self.state.scroll_down(1),
            TuiEvent::ScrollPageUp => self.state.scroll_up(PAGE),
            TuiEvent::ScrollPageDown => self.state.scroll_down(PAGE),
            _ => return None,
        }
        Some(())
    }
}
