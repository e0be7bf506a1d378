use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// A single keybinding entry for display.
struct KeyEntry {
    key: &'static str,
    description: &'static str,
}

const KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "j / ↓",
        description: "Move down",
    },
    KeyEntry {
        key: "k / ↑",
        description: "Move up",
    },
    KeyEntry {
        key: "g / Home",
        description: "Jump to first entry",
    },
    KeyEntry {
        key: "G / End",
        description: "Jump to last entry",
    },
    KeyEntry {
        key: "l / →",
        description: "Expand directory",
    },
    KeyEntry {
        key: "h / ←",
        description: "Collapse directory",
    },
    KeyEntry {
        key: "Enter",
        description: "Open note in editor / expand directory",
    },
    KeyEntry {
        key: "r",
        description: "Reload from disk",
    },
    KeyEntry {
        key: "?",
        description: "Toggle this help",
    },
    KeyEntry {
        key: "q / Esc / Ctrl+C",
        description: "Quit",
    },
];

/// Help overlay widget listing the keybindings.
pub struct HelpOverlay;

impl HelpOverlay {
    fn build_content_lines() -> Vec<Line<'static>> {
        let mut lines: Vec<Line<'static>> = Vec::new();

        lines.push(Line::from(Span::styled(
            " Keybindings ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));

        for entry in KEYS {
            let key_padded = format!("  {:<20}", entry.key);
            lines.push(Line::from(vec![
                Span::styled(
                    key_padded,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(entry.description),
            ]));
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        )));
        lines
    }

    /// Title, blank, one row per key, blank, footer.
    pub fn total_lines() -> usize {
        KEYS.len() + 4
    }
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let overlay_width = 64.min(area.width);
        let overlay_height = (Self::total_lines() as u16 + 2).min(area.height);

        let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
        let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
        let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        for (i, line) in Self::build_content_lines()
            .iter()
            .take(inner.height as usize)
            .enumerate()
        {
            buf.set_line(
                inner.x + 1,
                inner.y + i as u16,
                line,
                inner.width.saturating_sub(2),
            );
        }
    }
}
