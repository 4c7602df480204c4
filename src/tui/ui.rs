use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{MessageList, MetricsOverlay, Sidebar, TitleBar};

const SIDEBAR_WIDTH: u16 = 28;
const MAX_INPUT_LINES: u16 = 4;

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    use Constraint::{Length, Min};

    let input_lines = (tui.input_box.buffer.matches('\n').count() as u16 + 1).min(MAX_INPUT_LINES);
    let error_height = u16::from(app.error.is_some());
    let [title_area, body_area, error_area, input_area] = Layout::vertical([
        Length(1),
        Min(0),
        Length(error_height),
        Length(input_lines + 2),
    ])
    .areas(frame.area());
    let [sidebar_area, messages_area] =
        Layout::horizontal([Length(SIDEBAR_WIDTH), Min(0)]).areas(body_area);

    let active = app.sessions.active();
    TitleBar {
        session_title: &active.title,
        session_id: &active.id,
        status_message: &app.status_message,
        streaming: app.is_streaming(),
        spinner_frame,
    }
    .render(frame, title_area);

    Sidebar {
        registry: &app.sessions,
    }
    .render(frame, sidebar_area);

    MessageList {
        conversation: &app.conversation,
        streaming: app.is_streaming(),
        state: &mut tui.message_list,
    }
    .render(frame, messages_area);

    if let Some(error) = &app.error {
        let line = Line::from(vec![
            Span::styled(format!("Error: {error}"), Style::default().fg(Color::Red)),
            Span::styled(" (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(line, error_area);
    }

    tui.input_box.params = app.params;
    tui.input_box.busy = app.is_streaming();
    tui.input_box.render(frame, input_area);

    if let Some(metrics) = &app.metrics {
        MetricsOverlay { metrics }.render(frame, frame.area());
    }
}
