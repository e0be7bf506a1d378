//! Flattened, scrollable projection of the expanded part of the notes tree.

use std::ops::Range;
use std::path::PathBuf;

use crate::error::Result;
use crate::fs::guard::PathGuard;
use crate::fs::tree::{NodeKind, NoteTree, TreeNode};

/// Rows above the list: title line and a blank line.
pub const HEADER_ROWS: u16 = 2;
/// Rows below the list: a blank line and the status line.
pub const FOOTER_ROWS: u16 = 2;
/// Entries of context kept above and below the cursor while scrolling.
pub const SCROLL_MARGIN: usize = 2;

/// Rendering attributes of a visible entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory { expanded: bool },
    File { title: Option<String> },
}

/// One row of the projection: a node snapshot and its nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleEntry {
    pub name: String,
    pub path: PathBuf,
    pub depth: usize,
    pub kind: EntryKind,
}

impl VisibleEntry {
    fn from_node(node: &TreeNode, depth: usize) -> Self {
        let kind = match &node.kind {
            NodeKind::Directory { expanded, .. } => EntryKind::Directory {
                expanded: *expanded,
            },
            NodeKind::File { title } => EntryKind::File {
                title: title.clone(),
            },
        };
        Self {
            name: node.name.clone(),
            path: node.path.clone(),
            depth,
            kind,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { expanded: true })
    }

    /// Title for files that have one, otherwise the name.
    pub fn display_name(&self) -> &str {
        match &self.kind {
            EntryKind::File { title: Some(title) } => title,
            _ => &self.name,
        }
    }
}

/// Cursor and viewport over the visible entries.
#[derive(Debug, Default)]
pub struct Navigator {
    entries: Vec<VisibleEntry>,
    cursor: usize,
    scroll: usize,
    width: u16,
    height: u16,
}

impl Navigator {
    pub fn new(tree: &NoteTree) -> Self {
        let mut navigator = Self::default();
        navigator.recompute(tree);
        navigator
    }

    /// Rebuild the projection from scratch and clamp cursor and scroll.
    pub fn recompute(&mut self, tree: &NoteTree) {
        self.entries.clear();
        for node in tree.top_level() {
            Self::flatten_node(node, 0, &mut self.entries);
        }
        self.clamp_cursor();
        self.adjust_scroll();
    }

    fn flatten_node(node: &TreeNode, depth: usize, out: &mut Vec<VisibleEntry>) {
        out.push(VisibleEntry::from_node(node, depth));
        if node.is_expanded() {
            for child in node.children().unwrap_or(&[]) {
                Self::flatten_node(child, depth + 1, out);
            }
        }
    }

    pub fn entries(&self) -> &[VisibleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn selected(&self) -> Option<&VisibleEntry> {
        self.entries.get(self.cursor)
    }

    /// Move down one entry. Returns `false` at the end.
    pub fn move_down(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        self.adjust_scroll();
        true
    }

    /// Move up one entry. Returns `false` at the top.
    pub fn move_up(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.adjust_scroll();
        true
    }

    pub fn move_first(&mut self) {
        self.cursor = 0;
        self.adjust_scroll();
    }

    pub fn move_last(&mut self) {
        self.cursor = self.entries.len().saturating_sub(1);
        self.adjust_scroll();
    }

    /// Put cursor and viewport back on the first entry.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.scroll = 0;
    }

    /// Record the terminal size and re-fit the viewport.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.adjust_scroll();
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Rows available for entries, or `None` when the terminal is too small
    /// (or its size unknown) and the whole projection counts as the window.
    pub fn usable_rows(&self) -> Option<usize> {
        let usable = self.height.saturating_sub(HEADER_ROWS + FOOTER_ROWS) as usize;
        (usable > 0).then_some(usable)
    }

    /// Index range of the entries currently inside the viewport.
    pub fn window(&self) -> Range<usize> {
        match self.usable_rows() {
            Some(rows) => self.scroll..(self.scroll + rows).min(self.entries.len()),
            None => 0..self.entries.len(),
        }
    }

    /// Fresh guard check of the file at the cursor against `guard`'s root.
    ///
    /// `Ok(None)` when nothing or a directory is selected.
    pub fn open_target(&self, guard: &PathGuard) -> Result<Option<PathBuf>> {
        match self.selected() {
            Some(entry) if !entry.is_dir() => guard.contain(&entry.path).map(Some),
            _ => Ok(None),
        }
    }

    fn clamp_cursor(&mut self) {
        if self.entries.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.entries.len() {
            self.cursor = self.entries.len() - 1;
        }
    }

    fn adjust_scroll(&mut self) {
        let Some(usable) = self.usable_rows() else {
            self.scroll = 0;
            return;
        };
        // Tiny windows shrink the margin so the cursor always stays visible.
        let margin = SCROLL_MARGIN.min((usable - 1) / 2);

        if self.cursor < self.scroll + margin {
            self.scroll = self.cursor.saturating_sub(margin);
        }
        if self.cursor + margin >= self.scroll + usable {
            self.scroll = self.cursor + margin + 1 - usable;
        }
        let max_scroll = self.entries.len().saturating_sub(usable);
        self.scroll = self.scroll.min(max_scroll);
    }
}
