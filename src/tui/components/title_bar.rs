//! # TitleBar Component
//!
//! Single-line header: active session, status, and a streaming indicator.
//! Purely presentational; every field is a prop.
//!
//! ```text
//! Pocket | Hello there... (session-1712…) | Generating... ⠹
//! ```

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct TitleBar<'a> {
    pub session_title: &'a str,
    pub session_id: &'a str,
    pub status_message: &'a str,
    pub streaming: bool,
    pub spinner_frame: usize,
}

impl Component for TitleBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled("Pocket", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(" | {} ", self.session_title)),
            Span::styled(
                format!("({})", self.session_id),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if !self.status_message.is_empty() {
            spans.push(Span::raw(format!(" | {}", self.status_message)));
        }
        if self.streaming {
            spans.push(Span::styled(
                format!(" {}", SPINNER[self.spinner_frame % SPINNER.len()]),
                Style::default().fg(Color::Cyan),
            ));
        }
        frame.render_widget(Line::from(spans), area);
    }
}
