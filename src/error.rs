use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem or terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Root or scanned path does not exist.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Notes root resolves to something other than a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Permission or I/O failure listing a directory or opening a file.
    #[error("Unreadable: {}", .0.display())]
    Unreadable(PathBuf),

    /// Candidate resolves outside the notes root. Rendered exactly like `Unreadable`.
    #[error("Unreadable: {}", .0.display())]
    PathEscape(PathBuf),

    /// Generic I/O failure in the middle of a scan.
    #[error("Scan failed at {}: {source}", path.display())]
    ScanFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration could not be resolved.
    #[error("Config error: {0}")]
    Config(String),

    /// Editor resolution or launch failure.
    #[error("Editor error: {0}")]
    Editor(String),
}

impl AppError {
    /// Classify an I/O error raised while touching `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AppError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => AppError::Unreadable(path.to_path_buf()),
            _ => AppError::ScanFailure {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}
