//! Sandbox checks keeping every read, listing and open inside the notes root.
//!
//! Nothing here is cached: each call resolves symlinks again, since the
//! filesystem may change between two checks.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

/// Validates candidate paths against a trusted root directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Relative roots are anchored at the current directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).map_or(root, |abs| normalize(&abs));
        Self { root }
    }

    /// The root as configured, made absolute (symlinks not resolved).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative `candidate` onto the root and return its resolved
    /// absolute path, or `PathEscape` if it lands outside the root.
    pub fn join_within(&self, candidate: &Path) -> Result<PathBuf> {
        let clean = normalize(candidate);
        if clean.is_absolute() || starts_with_parent(&clean) {
            return Err(AppError::PathEscape(candidate.to_path_buf()));
        }

        let joined = normalize(&self.root.join(&clean));
        if !joined.starts_with(normalize(&self.root)) {
            return Err(AppError::PathEscape(candidate.to_path_buf()));
        }

        let resolved_root =
            fs::canonicalize(&self.root).map_err(|e| AppError::from_io(&self.root, e))?;
        let resolved = match fs::canonicalize(&joined) {
            Ok(resolved) => resolved,
            Err(_) if is_symlink(&joined) => resolve_dangling_link(&joined),
            Err(_) => resolve_missing(&joined),
        };

        if resolved == resolved_root || resolved.starts_with(&resolved_root) {
            Ok(resolved)
        } else {
            tracing::warn!(
                candidate = %candidate.display(),
                resolved = %resolved.display(),
                "path escapes notes root"
            );
            Err(AppError::PathEscape(candidate.to_path_buf()))
        }
    }

    /// Validate an absolute (or root-relative) path already pointing somewhere
    /// under the root.
    pub fn contain(&self, path: &Path) -> Result<PathBuf> {
        let rel = match relative_to(&self.root, path) {
            Some(rel) => rel,
            None => {
                // The configured root may itself be a symlink while `path` came
                // from an earlier resolution.
                let resolved_root =
                    fs::canonicalize(&self.root).map_err(|e| AppError::from_io(&self.root, e))?;
                relative_to(&resolved_root, path)
                    .ok_or_else(|| AppError::PathEscape(path.to_path_buf()))?
            }
        };
        self.join_within(&rel)
    }

    /// True when `path` is inside the root, is a regular file and can be read.
    pub fn is_readable_file(&self, path: &Path) -> bool {
        let Ok(safe) = self.contain(path) else {
            return false;
        };
        let Ok(mut file) = File::open(&safe) else {
            return false;
        };
        match file.metadata() {
            Ok(meta) if meta.is_file() => {}
            _ => return false,
        }
        let mut buf = [0u8; 1];
        let _ = file.read(&mut buf);
        true
    }

    /// True when `path` is inside the root and its listing can be opened.
    pub fn is_listable_dir(&self, path: &Path) -> bool {
        let Ok(safe) = self.contain(path) else {
            return false;
        };
        match fs::read_dir(&safe) {
            Ok(mut entries) => !matches!(entries.next(), Some(Err(_))),
            Err(_) => false,
        }
    }
}

/// Collapse `.` and `..` segments without touching the filesystem.
///
/// `..` above an absolute root stays at the root; leading `..` on a relative
/// path is preserved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// Resolve a path that does not exist yet through its nearest existing
/// ancestor, keeping the missing tail as written.
fn resolve_missing(path: &Path) -> PathBuf {
    let mut tail = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(mut resolved) = fs::canonicalize(parent) {
            for part in tail.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        current = parent;
    }
    path.to_path_buf()
}

/// Where a link with a missing target points, resolved as far as the
/// filesystem allows.
fn resolve_dangling_link(link: &Path) -> PathBuf {
    match fs::read_link(link) {
        Ok(target) => {
            let target = match link.parent() {
                Some(parent) => parent.join(target),
                None => target,
            };
            resolve_missing(&target)
        }
        Err(_) => resolve_missing(link),
    }
}

fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_symlink())
}

fn starts_with_parent(path: &Path) -> bool {
    matches!(path.components().next(), Some(Component::ParentDir))
}

/// Lexical path of `target` relative to `base`. Relative targets are taken as
/// already relative to `base`.
fn relative_to(base: &Path, target: &Path) -> Option<PathBuf> {
    if target.is_relative() {
        return Some(normalize(target));
    }
    normalize(target)
        .strip_prefix(normalize(base))
        .ok()
        .map(Path::to_path_buf)
}
