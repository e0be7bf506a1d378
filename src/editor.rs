//! External editor resolution and launching.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::error::{AppError, Result};

/// Editors that may be launched. Anything else in the config is rejected.
pub const ALLOWED_EDITORS: &[&str] = &["vim", "vi", "nano", "nvim", "hx", "emacs"];

/// Editor used when none is configured.
pub const DEFAULT_EDITOR: &str = "vim";

/// A verified file handed to a resolved editor binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub editor: PathBuf,
    pub file: PathBuf,
}

/// Check that `raw` is a bare, allowlisted command name.
pub fn validate_name(raw: &str) -> Result<&str> {
    let name = raw.trim();
    let name = if name.is_empty() { DEFAULT_EDITOR } else { name };

    let is_bare = Path::new(name).file_name().is_some_and(|base| base == name)
        && !name.contains([' ', '/', '\t', '\\']);
    if !is_bare {
        return Err(AppError::Editor(format!(
            "invalid editor: {name:?} (use a bare command name)"
        )));
    }

    if !ALLOWED_EDITORS.contains(&name) {
        return Err(AppError::Editor(format!(
            "editor not allowed: {name:?} (allowed: {})",
            ALLOWED_EDITORS.join(", ")
        )));
    }
    Ok(name)
}

/// Validate `raw` and locate the binary on `PATH`.
pub fn resolve(raw: &str) -> Result<PathBuf> {
    let name = validate_name(raw)?;
    which::which(name)
        .map_err(|_| AppError::Editor(format!("editor not found in PATH: {name:?}")))
}

/// Run `editor` on `file` with the terminal's stdio attached and wait for it
/// to exit. There is no timeout.
pub async fn launch(request: &OpenRequest) -> Result<()> {
    tracing::info!(
        editor = %request.editor.display(),
        file = %request.file.display(),
        "launching editor"
    );
    let status = tokio::process::Command::new(&request.editor)
        .arg(&request.file)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| AppError::Editor(format!("failed to start {}: {e}", request.editor.display())))?;

    tracing::info!(%status, "editor exited");
    if status.success() {
        Ok(())
    } else {
        Err(AppError::Editor(format!(
            "{} exited with {status}",
            request.editor.display()
        )))
    }
}
