//! Session list shown on the left. Highlights the active session; a local
//! session the server doesn't list yet is shown on top in italics.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, List, ListItem};

use crate::core::session::SessionRegistry;
use crate::tui::component::Component;

pub struct Sidebar<'a> {
    pub registry: &'a SessionRegistry,
}

impl Sidebar<'_> {
    fn items(&self) -> Vec<ListItem<'static>> {
        let active_id = self.registry.active_id();
        let mut items = Vec::new();

        if !self.registry.sessions().iter().any(|s| s.id == active_id) {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("▸ {}", self.registry.active().title),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::ITALIC | Modifier::BOLD),
            ))));
        }

        for session in self.registry.sessions() {
            let active = session.id == active_id;
            let marker = if active { "▸ " } else { "  " };
            let style = if active {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let date = session.created_at.get(..10).unwrap_or(&session.created_at);
            items.push(ListItem::new(vec![
                Line::from(Span::styled(format!("{marker}{}", session.title), style)),
                Line::from(Span::styled(
                    format!("  {date}"),
                    Style::default().fg(Color::DarkGray),
                )),
            ]));
        }
        items
    }
}

impl Component for Sidebar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let list = List::new(self.items()).block(
            Block::bordered()
                .border_type(BorderType::Rounded)
                .title("Sessions"),
        );
        frame.render_widget(list, area);
    }
}
