//! Centered popup showing the server's diagnostics object verbatim.

use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph, Wrap};

use crate::tui::component::Component;

pub struct MetricsOverlay<'a> {
    pub metrics: &'a serde_json::Value,
}

fn centered(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Percentage(width_percent)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Percentage(height_percent)])
        .flex(Flex::Center)
        .areas(area);
    area
}

impl Component for MetricsOverlay<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let popup = centered(area, 60, 60);
        let body = serde_json::to_string_pretty(self.metrics)
            .unwrap_or_else(|_| self.metrics.to_string());
        let paragraph = Paragraph::new(body)
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .title("Server metrics (Esc to close)"),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(Clear, popup);
        frame.render_widget(paragraph, popup);
    }
}
