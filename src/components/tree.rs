use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::navigator::{EntryKind, Navigator, VisibleEntry};

/// Columns of indent per nesting level.
const INDENT: usize = 2;

/// Renders the navigator's current window of entries, one per row.
pub struct NoteTreeWidget<'a> {
    navigator: &'a Navigator,
}

impl<'a> NoteTreeWidget<'a> {
    pub fn new(navigator: &'a Navigator) -> Self {
        Self { navigator }
    }

    fn glyph(entry: &VisibleEntry) -> &'static str {
        match entry.kind {
            EntryKind::Directory { expanded: true } => "▾",
            EntryKind::Directory { expanded: false } => "▸",
            EntryKind::File { .. } => "•",
        }
    }

    /// Indent, glyph and label of one row.
    pub fn line_text(entry: &VisibleEntry) -> String {
        format!(
            "{}{} {}",
            " ".repeat(entry.depth * INDENT),
            Self::glyph(entry),
            entry.display_name()
        )
    }
}

impl<'a> Widget for NoteTreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let entries = self.navigator.entries();
        let cursor = self.navigator.cursor();
        let window = self.navigator.window();

        for (row, idx) in window.enumerate() {
            let y = area.y + row as u16;
            if y >= area.y + area.height {
                break;
            }
            let entry = &entries[idx];

            let style = if idx == cursor {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if entry.is_dir() {
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let line = Line::from(Span::styled(Self::line_text(entry), style));
            buf.set_line(area.x, y, &line, area.width);
        }
    }
}
