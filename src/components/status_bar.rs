use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::app::HELP_HINT;

/// Status line: the current message, or the key hint when there is none.
pub struct StatusBarWidget<'a> {
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new() -> Self {
        Self {
            status_message: None,
            is_error: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }
}

impl<'a> Default for StatusBarWidget<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let (text, style) = match self.status_message {
            Some(msg) if self.is_error => (
                msg,
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Some(msg) => (msg, Style::default().fg(Color::Gray)),
            None => (HELP_HINT, Style::default().fg(Color::DarkGray)),
        };

        // Status text always sits on the last row of the footer.
        let y = area.y + area.height - 1;
        let line = Line::from(Span::styled(text, style));
        buf.set_line(area.x, y, &line, area.width);
    }
}
