//! # InputBox Component
//!
//! Prompt editor. Owns the text buffer and cursor; shows the generation
//! parameters (a prop from app state) in its title.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::core::params::GenerationParams;
use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Submit(String),
    ContentChanged,
}

pub struct InputBox {
    pub buffer: String,
    /// Current generation settings (Prop)
    pub params: GenerationParams,
    /// Dimmed while a reply is streaming (Prop)
    pub busy: bool,
    /// Byte offset of the cursor in `buffer`, always on a char boundary.
    cursor: usize,
}

impl InputBox {
    pub fn new(params: GenerationParams) -> Self {
        Self {
            buffer: String::new(),
            params,
            busy: false,
            cursor: 0,
        }
    }

    fn prev_boundary(&self) -> usize {
        self.buffer[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.buffer[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
            .unwrap_or(self.buffer.len())
    }

    /// Cursor cell relative to the inner area, for single-line content.
    fn cursor_column(&self) -> u16 {
        let line_start = self.buffer[..self.cursor]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.buffer[line_start..self.cursor].width() as u16
    }

    fn cursor_row(&self) -> u16 {
        self.buffer[..self.cursor].matches('\n').count() as u16
    }
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(
            "Prompt (max tokens {} | temp {:.1})",
            self.params.max_tokens, self.params.temperature
        );
        let color = if self.busy { Color::DarkGray } else { Color::Green };
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(title);
        let input = Paragraph::new(self.buffer.as_str())
            .block(block)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: false });
        frame.render_widget(input, area);

        let inner_width = area.width.saturating_sub(2).max(1);
        let x = area.x + 1 + self.cursor_column().min(inner_width - 1);
        let y = area.y + 1 + self.cursor_row().min(area.height.saturating_sub(3));
        frame.set_cursor_position((x, y));
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                self.buffer.insert_str(self.cursor, text);
                self.cursor += text.len();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace if self.cursor > 0 => {
                let prev = self.prev_boundary();
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Delete if self.cursor < self.buffer.len() => {
                let next = self.next_boundary();
                self.buffer.drain(self.cursor..next);
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorLeft if self.cursor > 0 => {
                self.cursor = self.prev_boundary();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorRight if self.cursor < self.buffer.len() => {
                self.cursor = self.next_boundary();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorHome => {
                self.cursor = 0;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorEnd => {
                self.cursor = self.buffer.len();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Submit if !self.buffer.trim().is_empty() => {
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                Some(InputEvent::Submit(text))
            }
            _ => None,
        }
    }
}
