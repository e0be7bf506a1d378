use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::components::help::HelpOverlay;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tree::NoteTreeWidget;
use crate::navigator::{FOOTER_ROWS, HEADER_ROWS};

pub const TITLE: &str = "nnav - Notes Navigator";

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Keep the viewport in step with the frame actually drawn.
    if app.navigator.size() != (area.width, area.height) {
        app.navigator.resize(area.width, area.height);
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(0),
            Constraint::Length(FOOTER_ROWS),
        ])
        .split(area);

    render_header(app, frame, chunks[0]);
    frame.render_widget(NoteTreeWidget::new(&app.navigator), chunks[1]);

    let status_bar = match &app.status_message {
        Some(status) => StatusBarWidget::new().status_message(&status.text, status.is_error),
        None => StatusBarWidget::new(),
    };
    frame.render_widget(status_bar, chunks[2]);

    if app.show_help {
        frame.render_widget(HelpOverlay, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        TITLE,
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(term) = app.tree.search() {
        spans.push(Span::styled(
            format!("  search: {}", term.as_str()),
            Style::default().fg(Color::Yellow),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::fs::scanner::SearchTerm;
    use ratatui::{backend::TestBackend, Terminal};
    use std::fs;
    use tempfile::TempDir;

    fn row(terminal: &Terminal<TestBackend>, y: u16) -> String {
        let buf = terminal.backend().buffer();
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    #[test]
    fn layout_has_header_list_and_status() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "# Alpha\n").unwrap();
        let mut app = App::new(
            dir.path(),
            SearchTerm::new("alpha"),
            Box::new(AppConfig::default()),
        )
        .unwrap();

        let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        assert_eq!(row(&terminal, 0), "nnav - Notes Navigator  search: alpha");
        assert_eq!(row(&terminal, 2), "• Alpha");
        assert!(row(&terminal, 7).starts_with("j/k move"));
        assert_eq!(app.navigator.size(), (60, 8));
    }

    #[test]
    fn help_overlay_is_drawn() {
        let dir = TempDir::new().unwrap();
        let mut app = App::new(dir.path(), None, Box::new(AppConfig::default())).unwrap();
        app.toggle_help();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text: String = (0..24).map(|y| row(&terminal, y)).collect();
        assert!(text.contains("Keybindings"));
    }
}
