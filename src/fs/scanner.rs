//! One-level directory scanning with note filtering, title extraction and
//! search-term inclusion.

use std::cmp::Ordering;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::fs::guard::PathGuard;
use crate::fs::tree::{NodeKind, TreeNode};

/// Extensions (lowercase, without the dot) that count as notes.
pub const NOTE_EXTENSIONS: &[&str] = &["md", "txt"];

/// Markdown heading, `#` through `######`, capturing the heading text.
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#{1,6}\s*(.+?)\s*$").expect("heading pattern compiles"));

/// A case-insensitive substring filter applied to note contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    raw: String,
    folded: String,
}

impl SearchTerm {
    /// Returns `None` for empty or whitespace-only input.
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            folded: raw.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, line: &str) -> bool {
        line.to_lowercase().contains(&self.folded)
    }
}

/// Result of the single pass over a note file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteScan {
    pub title: Option<String>,
    /// Always `true` when no search term was given.
    pub matched: bool,
}

/// Scan exactly one level of `dir` and return its child nodes, directories
/// first, each group ordered case-insensitively by name.
///
/// Entries that cannot be inspected, read or validated are left out. With a
/// search term, subdirectories are scanned eagerly and kept (pre-expanded) only
/// when something below them matches.
pub fn read_dir_nodes(
    guard: &PathGuard,
    dir: &Path,
    search: Option<&SearchTerm>,
) -> Result<Vec<TreeNode>> {
    let safe_dir = guard.contain(dir).map_err(|err| match err {
        AppError::PathEscape(_) => AppError::Unreadable(dir.to_path_buf()),
        other => other,
    })?;
    let entries = fs::read_dir(&safe_dir).map_err(|e| AppError::from_io(&safe_dir, e))?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!(dir = %safe_dir.display(), %err, "skipping unreadable entry");
                continue;
            }
        };
        // Does not follow symlinks: a link is never scanned as a directory.
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!(path = %entry.path().display(), %err, "skipping entry without metadata");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        let node = if metadata.is_dir() {
            scan_directory(guard, name, &path, search)
        } else {
            scan_file(guard, name, &path, search)
        };
        if let Some(node) = node {
            nodes.push(node);
        }
    }

    sort_entries(&mut nodes);
    Ok(nodes)
}

fn scan_directory(
    guard: &PathGuard,
    name: String,
    path: &Path,
    search: Option<&SearchTerm>,
) -> Option<TreeNode> {
    let safe = guard.contain(path).ok()?;
    if !guard.is_listable_dir(&safe) {
        tracing::debug!(path = %path.display(), "skipping unlistable directory");
        return None;
    }

    let Some(term) = search else {
        return Some(TreeNode::directory(name, safe));
    };

    match read_dir_nodes(guard, &safe, Some(term)) {
        Ok(children) if !children.is_empty() => Some(TreeNode {
            name,
            path: safe,
            kind: NodeKind::Directory {
                expanded: true,
                children: Some(children),
            },
        }),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(path = %path.display(), %err, "skipping directory during search");
            None
        }
    }
}

fn scan_file(
    guard: &PathGuard,
    name: String,
    path: &Path,
    search: Option<&SearchTerm>,
) -> Option<TreeNode> {
    if !is_note(path) {
        return None;
    }
    if !guard.is_readable_file(path) {
        tracing::debug!(path = %path.display(), "skipping unreadable note");
        return None;
    }
    let safe = guard.contain(path).ok()?;

    let scan = match scan_note(&safe, search) {
        Ok(scan) => scan,
        Err(err) => {
            tracing::debug!(path = %safe.display(), %err, "failed to scan note");
            return None;
        }
    };
    if !scan.matched {
        return None;
    }
    Some(TreeNode::file(name, safe, scan.title))
}

/// Whether `path` carries one of the note extensions.
pub fn is_note(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| NOTE_EXTENSIONS.contains(&ext.as_str()))
}

/// Read `path` line by line, extracting the first heading and, when a search
/// term is given, whether any line contains it. Stops once both are known.
///
/// Lines are read without a length cap and decoded lossily.
pub fn scan_note(path: &Path, search: Option<&SearchTerm>) -> io::Result<NoteScan> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(64 * 1024, file);
    let mut buf = Vec::new();

    let mut title = None;
    let mut heading_seen = false;
    let mut matched = search.is_none();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');

        // Only the first heading counts, even when its text is blank.
        if !heading_seen {
            if let Some(text) = heading_text(line) {
                heading_seen = true;
                title = (!text.is_empty()).then_some(text);
            }
        }
        if let (false, Some(term)) = (matched, search) {
            matched = term.matches(line);
        }
        if heading_seen && matched {
            break;
        }
    }

    Ok(NoteScan { title, matched })
}

/// Trimmed heading text of `line`, if it is a Markdown heading. The text may
/// be empty for a heading made of whitespace.
pub fn heading_text(line: &str) -> Option<String> {
    let captures = HEADING_RE.captures(line)?;
    Some(captures.get(1)?.as_str().trim().to_string())
}

/// Directories before files, then case-insensitive name order.
pub fn sort_entries(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| compare_names(&a.name, &b.name))
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup_notes() -> (TempDir, PathGuard) {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(root.join("Zeta")).unwrap();
        fs::create_dir(root.join("alpha")).unwrap();
        fs::write(root.join("b.md"), "## Hello World\nbody\n").unwrap();
        fs::write(root.join("A.txt"), "no heading here\n").unwrap();
        fs::write(root.join("image.png"), "not a note").unwrap();
        fs::write(root.join("alpha").join("inner.md"), "# Inner\n").unwrap();
        let guard = PathGuard::new(&root);
        (dir, guard)
    }

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn heading_text_matches_levels() {
        assert_eq!(heading_text("# A"), Some("A".to_string()));
        assert_eq!(heading_text("  ###   Spaced out   "), Some("Spaced out".to_string()));
        assert_eq!(heading_text("######Six"), Some("Six".to_string()));
        assert_eq!(heading_text("plain text"), None);
        assert_eq!(heading_text("#   "), Some(String::new()));
    }

    #[test]
    fn search_term_ignores_blank_input() {
        assert!(SearchTerm::new("").is_none());
        assert!(SearchTerm::new("   ").is_none());
        let term = SearchTerm::new(" Token ").unwrap();
        assert_eq!(term.as_str(), "Token");
        assert!(term.matches("a TOKEN here"));
        assert!(!term.matches("tok en"));
    }

    #[test]
    fn is_note_checks_extension() {
        assert!(is_note(Path::new("a.md")));
        assert!(is_note(Path::new("a.TXT")));
        assert!(!is_note(Path::new("a.markdown")));
        assert!(!is_note(Path::new("README")));
    }

    #[test]
    fn dirs_first_case_insensitive() {
        let (_dir, guard) = setup_notes();
        let nodes = read_dir_nodes(&guard, guard.root(), None).unwrap();
        assert_eq!(names(&nodes), vec!["alpha", "Zeta", "A.txt", "b.md"]);
    }

    #[test]
    fn titles_are_extracted() {
        let (_dir, guard) = setup_notes();
        let nodes = read_dir_nodes(&guard, guard.root(), None).unwrap();
        let b = nodes.iter().find(|n| n.name == "b.md").unwrap();
        assert_eq!(b.title(), Some("Hello World"));
        let a = nodes.iter().find(|n| n.name == "A.txt").unwrap();
        assert_eq!(a.title(), None);
        assert_eq!(a.display_name(), "A.txt");
    }

    #[test]
    fn directories_are_not_loaded_without_search() {
        let (_dir, guard) = setup_notes();
        let nodes = read_dir_nodes(&guard, guard.root(), None).unwrap();
        let alpha = &nodes[0];
        assert!(alpha.is_dir());
        assert!(!alpha.is_expanded());
        assert!(alpha.children().is_none());
    }

    #[test]
    fn search_keeps_matches_and_expands_ancestors() {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("deep").join("er")).unwrap();
        fs::create_dir(root.join("empty_hits")).unwrap();
        fs::write(root.join("deep").join("er").join("a.md"), "# A\nsome Token here\n").unwrap();
        fs::write(root.join("b.md"), "# B\nnothing\n").unwrap();
        fs::write(root.join("empty_hits").join("c.md"), "nothing\n").unwrap();
        let guard = PathGuard::new(&root);

        let term = SearchTerm::new("token").unwrap();
        let nodes = read_dir_nodes(&guard, &root, Some(&term)).unwrap();

        assert_eq!(names(&nodes), vec!["deep"]);
        let deep = &nodes[0];
        assert!(deep.is_expanded());
        let er = &deep.children().unwrap()[0];
        assert_eq!(er.name, "er");
        assert!(er.is_expanded());
        let leaf = &er.children().unwrap()[0];
        assert_eq!(leaf.name, "a.md");
        assert_eq!(leaf.title(), Some("A"));
    }

    #[test]
    fn scan_note_finds_title_after_match() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n.md");
        fs::write(&path, "first line has needle\n\n# Late Title\n").unwrap();
        let term = SearchTerm::new("NEEDLE").unwrap();
        let scan = scan_note(&path, Some(&term)).unwrap();
        assert_eq!(
            scan,
            NoteScan {
                title: Some("Late Title".to_string()),
                matched: true
            }
        );
    }

    #[test]
    fn scan_note_handles_very_long_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.md");
        let mut content = "x".repeat(11 * 1024 * 1024);
        content.push_str(" needle\n# After Long Line\n");
        fs::write(&path, content).unwrap();

        let term = SearchTerm::new("needle").unwrap();
        let scan = scan_note(&path, Some(&term)).unwrap();
        assert!(scan.matched);
        assert_eq!(scan.title.as_deref(), Some("After Long Line"));
    }

    #[test]
    fn blank_first_heading_leaves_no_title() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.md");
        fs::write(&path, "#   \n# Second\n").unwrap();
        let scan = scan_note(&path, None).unwrap();
        assert_eq!(scan.title, None);

        let guard = PathGuard::new(dir.path());
        let nodes = read_dir_nodes(&guard, dir.path(), None).unwrap();
        assert_eq!(nodes[0].display_name(), "blank.md");
    }

    #[test]
    fn scan_note_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.md");
        fs::write(&path, b"\xff\xfe junk\n# Still Found\r\n").unwrap();
        let scan = scan_note(&path, None).unwrap();
        assert_eq!(scan.title.as_deref(), Some("Still Found"));
    }

    #[test]
    fn missing_directory_reports_not_found() {
        let (_dir, guard) = setup_notes();
        let err = read_dir_nodes(&guard, &guard.root().join("gone"), None).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn directory_outside_root_is_unreadable() {
        let (_dir, guard) = setup_notes();
        let outside = TempDir::new().unwrap();
        let err = read_dir_nodes(&guard, outside.path(), None).unwrap_err();
        assert!(matches!(err, AppError::Unreadable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn escaping_symlinks_never_show_up() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.md"), "# Secret\n").unwrap();
        fs::create_dir(outside.path().join("vault")).unwrap();

        let (_dir, guard) = setup_notes();
        let root = guard.root().to_path_buf();
        std::os::unix::fs::symlink(outside.path().join("secret.md"), root.join("leak.md")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("missing.md"), root.join("dangling.md"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path().join("vault"), root.join("vault.md")).unwrap();

        let nodes = read_dir_nodes(&guard, &root, None).unwrap();
        let leaked: Vec<&PathBuf> = nodes
            .iter()
            .map(|n| &n.path)
            .filter(|p| !p.starts_with(&root))
            .collect();
        assert!(leaked.is_empty(), "{leaked:?}");
        assert!(!names(&nodes).contains(&"leak.md"));
        assert!(!names(&nodes).contains(&"dangling.md"));
        assert!(!names(&nodes).contains(&"vault.md"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, guard) = setup_notes();
        let root = guard.root().to_path_buf();
        let locked = root.join("locked.md");
        fs::write(&locked, "# Locked\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read anything; nothing to assert then.
        if File::open(&locked).is_ok() {
            return;
        }
        let nodes = read_dir_nodes(&guard, &root, None).unwrap();
        assert!(!names(&nodes).contains(&"locked.md"));
    }
}
