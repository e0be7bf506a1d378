use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::fs::guard::PathGuard;
use crate::fs::scanner::{read_dir_nodes, SearchTerm};

/// Kind-specific state of a node. The kind never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory {
        expanded: bool,
        /// `None` until scanned; afterwards the complete, filtered listing.
        children: Option<Vec<TreeNode>>,
    },
    File {
        title: Option<String>,
    },
}

/// A note file or directory under the notes root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    /// Absolute, guard-verified location.
    pub path: PathBuf,
    pub kind: NodeKind,
}

impl TreeNode {
    /// A collapsed directory whose children have not been scanned yet.
    pub fn directory(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            kind: NodeKind::Directory {
                expanded: false,
                children: None,
            },
        }
    }

    pub fn file(name: String, path: PathBuf, title: Option<String>) -> Self {
        Self {
            name,
            path,
            kind: NodeKind::File { title },
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { expanded: true, .. })
    }

    /// Loaded children of a directory; `None` for files and unscanned directories.
    pub fn children(&self) -> Option<&[TreeNode]> {
        match &self.kind {
            NodeKind::Directory {
                children: Some(children),
                ..
            } => Some(children),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { title } => title.as_deref(),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Title for files that have one, otherwise the file or directory name.
    pub fn display_name(&self) -> &str {
        self.title().unwrap_or(&self.name)
    }

    /// Load children on first use and mark the directory expanded.
    ///
    /// Returns whether anything changed. On a scan error the node is left
    /// untouched.
    pub fn expand(&mut self, guard: &PathGuard, search: Option<&SearchTerm>) -> Result<bool> {
        let NodeKind::Directory { expanded, children } = &mut self.kind else {
            return Ok(false);
        };
        if *expanded && children.is_some() {
            return Ok(false);
        }
        if children.is_none() {
            let loaded = read_dir_nodes(guard, &self.path, search)?;
            tracing::debug!(path = %self.path.display(), count = loaded.len(), "loaded directory");
            *children = Some(loaded);
        }
        *expanded = true;
        Ok(true)
    }

    /// Hide a directory's children, keeping them cached.
    pub fn collapse(&mut self) -> bool {
        match &mut self.kind {
            NodeKind::Directory { expanded, .. } if *expanded => {
                *expanded = false;
                true
            }
            _ => false,
        }
    }
}

/// The notes tree: a synthetic, always-expanded root that is never displayed,
/// plus the scan parameters used to fill it.
#[derive(Debug)]
pub struct NoteTree {
    root: TreeNode,
    guard: PathGuard,
    search: Option<SearchTerm>,
}

impl NoteTree {
    /// Validate `root` and scan its first level.
    pub fn build(root: &Path, search: Option<SearchTerm>) -> Result<Self> {
        let metadata = fs::metadata(root).map_err(|e| AppError::from_io(root, e))?;
        if !metadata.is_dir() {
            return Err(AppError::NotADirectory(root.to_path_buf()));
        }

        let guard = PathGuard::new(root);
        if !guard.is_listable_dir(guard.root()) {
            return Err(AppError::Unreadable(root.to_path_buf()));
        }
        let resolved = guard.contain(guard.root())?;
        let children = read_dir_nodes(&guard, &resolved, search.as_ref())?;

        let name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| resolved.to_string_lossy().to_string());

        tracing::info!(
            root = %resolved.display(),
            entries = children.len(),
            search = search.as_ref().map(SearchTerm::as_str),
            "built notes tree"
        );

        Ok(Self {
            root: TreeNode {
                name,
                path: resolved,
                kind: NodeKind::Directory {
                    expanded: true,
                    children: Some(children),
                },
            },
            guard,
            search,
        })
    }

    /// Build a fresh tree from the same root and search term.
    pub fn reload(&self) -> Result<Self> {
        Self::build(self.guard.root(), self.search.clone())
    }

    /// Entries shown at depth 0: the children of the hidden root.
    pub fn top_level(&self) -> &[TreeNode] {
        self.root.children().unwrap_or(&[])
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn search(&self) -> Option<&SearchTerm> {
        self.search.as_ref()
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Expand the directory at `path`. Unknown paths and files are no-ops.
    pub fn expand(&mut self, path: &Path) -> Result<bool> {
        let search = self.search.as_ref();
        match Self::find_dir_mut(&mut self.root, path) {
            Some(node) => node.expand(&self.guard, search),
            None => Ok(false),
        }
    }

    /// Collapse the directory at `path`. The hidden root stays expanded.
    pub fn collapse(&mut self, path: &Path) -> bool {
        if self.root.path == path {
            return false;
        }
        match Self::find_dir_mut(&mut self.root, path) {
            Some(node) => node.collapse(),
            None => false,
        }
    }

    /// Find a loaded node by path.
    pub fn find(&self, path: &Path) -> Option<&TreeNode> {
        Self::find_in(&self.root, path)
    }

    fn find_in<'a>(node: &'a TreeNode, target: &Path) -> Option<&'a TreeNode> {
        if node.path == target {
            return Some(node);
        }
        node.children()?
            .iter()
            .find_map(|child| Self::find_in(child, target))
    }

    /// Find a mutable directory by path, descending only along matching prefixes.
    fn find_dir_mut<'a>(node: &'a mut TreeNode, target: &Path) -> Option<&'a mut TreeNode> {
        if node.path == target {
            return node.is_dir().then_some(node);
        }
        if let NodeKind::Directory {
            children: Some(children),
            ..
        } = &mut node.kind
        {
            for child in children.iter_mut() {
                if child.is_dir() && target.starts_with(&child.path) {
                    if let Some(found) = Self::find_dir_mut(child, target) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }
}
