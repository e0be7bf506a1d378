use std::path::Path;
use std::time::Instant;

use crate::config::ConfigSource;
use crate::editor::{self, OpenRequest};
use crate::error::{AppError, Result};
use crate::fs::guard::PathGuard;
use crate::fs::scanner::SearchTerm;
use crate::fs::tree::NoteTree;
use crate::navigator::Navigator;

/// Shown in the status line when nothing else is.
pub const HELP_HINT: &str = "j/k move  l/h expand/collapse  enter open  r reload  ? help  q quit";

/// A transient message in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Main application state.
pub struct App {
    pub tree: NoteTree,
    pub navigator: Navigator,
    config: Box<dyn ConfigSource>,
    pub should_quit: bool,
    pub show_help: bool,
    pub status_message: Option<StatusMessage>,
    pending_open: Option<OpenRequest>,
}

impl App {
    /// Build the tree for `root` and put the cursor on the first entry.
    pub fn new(
        root: &Path,
        search: Option<SearchTerm>,
        config: Box<dyn ConfigSource>,
    ) -> Result<Self> {
        let tree = NoteTree::build(root, search)?;
        let navigator = Navigator::new(&tree);
        Ok(Self {
            tree,
            navigator,
            config,
            should_quit: false,
            show_help: false,
            status_message: None,
            pending_open: None,
        })
    }

    pub fn select_next(&mut self) {
        self.navigator.move_down();
    }

    pub fn select_previous(&mut self) {
        self.navigator.move_up();
    }

    pub fn select_first(&mut self) {
        self.navigator.move_first();
    }

    pub fn select_last(&mut self) {
        self.navigator.move_last();
    }

    /// Expand the directory under the cursor, loading its children on first use.
    pub fn expand_selected(&mut self) {
        let Some(entry) = self.navigator.selected() else {
            return;
        };
        if !entry.is_dir() {
            return;
        }
        let path = entry.path.clone();
        let name = entry.name.clone();
        match self.tree.expand(&path) {
            Ok(true) => self.navigator.recompute(&self.tree),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "expand failed");
                self.set_error_status(format!("cannot open {name}"));
            }
        }
    }

    /// Collapse the directory under the cursor. Files are left alone.
    pub fn collapse_selected(&mut self) {
        let Some(entry) = self.navigator.selected() else {
            return;
        };
        if !entry.is_expanded() {
            return;
        }
        let path = entry.path.clone();
        if self.tree.collapse(&path) {
            self.navigator.recompute(&self.tree);
        }
    }

    /// `Enter`: directories expand, files are queued for the editor.
    pub fn open_selected(&mut self) {
        let Some(entry) = self.navigator.selected() else {
            return;
        };
        if entry.is_dir() {
            self.expand_selected();
            return;
        }
        let name = entry.name.clone();
        match self.resolve_open_request() {
            Ok(Some(request)) => self.pending_open = Some(request),
            Ok(None) => {}
            Err(AppError::Editor(msg)) => {
                tracing::warn!(error = %msg, "editor rejected");
                self.set_error_status(format!("editor error: {msg}"));
            }
            Err(e) => {
                tracing::warn!(entry = %name, error = %e, "open refused");
                self.set_error_status(format!("cannot open {name}"));
            }
        }
    }

    /// Re-read the configuration and check the selected file against the
    /// root it names now.
    fn resolve_open_request(&self) -> Result<Option<OpenRequest>> {
        let config = self.config.current();
        let guard = PathGuard::new(config.notes_root()?);
        let Some(file) = self.navigator.open_target(&guard)? else {
            return Ok(None);
        };
        if !guard.is_readable_file(&file) {
            return Err(AppError::Unreadable(file));
        }
        let editor = editor::resolve(config.editor())?;
        Ok(Some(OpenRequest { editor, file }))
    }

    /// Hand over the queued editor launch, if any.
    pub fn take_open_request(&mut self) -> Option<OpenRequest> {
        self.pending_open.take()
    }

    /// Rebuild the tree from disk (`r`).
    pub fn reload(&mut self) {
        match self.rebuild() {
            Ok(count) => self.set_status_message(format!("reloaded ({count} entries)")),
            Err(e) => self.report_reload_failure(e),
        }
    }

    /// Called once the editor has given the terminal back.
    pub fn handle_editor_exit(&mut self, failure: Option<String>) {
        let rebuilt = self.rebuild();
        self.status_message = None;
        if let Some(msg) = failure {
            self.set_error_status(format!("editor error: {msg}"));
        }
        if let Err(e) = rebuilt {
            self.report_reload_failure(e);
        }
    }

    /// Replace the tree on success; a failure leaves the current one in place.
    fn rebuild(&mut self) -> Result<usize> {
        let tree = self.tree.reload()?;
        self.tree = tree;
        self.navigator.reset();
        self.navigator.recompute(&self.tree);
        tracing::info!(entries = self.navigator.len(), "reloaded notes tree");
        Ok(self.navigator.len())
    }

    fn report_reload_failure(&mut self, err: AppError) {
        tracing::warn!(error = %err, "reload failed");
        self.set_error_status(format!("reload failed: {err}"));
    }

    pub fn set_status_message(&mut self, text: String) {
        self.status_message = Some(StatusMessage {
            text,
            is_error: false,
            created: Instant::now(),
        });
    }

    pub fn set_error_status(&mut self, text: String) {
        self.status_message = Some(StatusMessage {
            text,
            is_error: true,
            created: Instant::now(),
        });
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some(ref status) = self.status_message {
            if status.created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}
