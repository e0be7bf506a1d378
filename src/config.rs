//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--notes-dir`, `--editor`)
//! 2. `$NNAV_CONFIG` environment variable (path to config file)
//! 3. Global `~/.config/nnav/config.toml`
//! 4. Built-in defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::editor::DEFAULT_EDITOR;
use crate::error::{AppError, Result};

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Notes directory; `~` and `~/...` are expanded.
    pub notesdir: Option<String>,
    /// Editor command name (must be on the allowlist).
    pub editor: Option<String>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Notes directory under `$HOME` when nothing is configured.
pub const DEFAULT_NOTES_SUBDIR: &str = "notes";
/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "NNAV_CONFIG";

/// Written on first run when no global config exists.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# nnav configuration
# notesdir: path to your notes directory (e.g. ~/notes). Must be readable by your user.
# editor: which editor to launch. Allowed values: vim, nvim, vi, nano, hx, emacs

[general]
notesdir = "~/notes"
editor = "vim"
"#;

// ── Config file locator ──────────────────────────────────────────────────────

/// Location of the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nnav").join("config.toml"))
}

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path; that one is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    if let Some(global) = global_config_path() {
        paths.push(global);
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse config file");
            None
        }
    }
}

/// Create the global config file with defaults if it is missing.
pub fn ensure_global_config() -> Result<Option<PathBuf>> {
    match global_config_path() {
        Some(path) => ensure_config_at(&path).map(Some),
        None => Ok(None),
    }
}

/// Create `path` with the default template if missing and keep it private to
/// the user (`0600` on Unix).
fn ensure_config_at(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        tracing::info!(path = %path.display(), "created default config");
    }
    restrict_permissions(path)?;
    Ok(path.to_path_buf())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Expand a leading `~` or `~/` to `home`. Other forms (`~user`, `$VAR`) are
/// left untouched.
pub fn expand_tilde(raw: &str, home: Option<&Path>) -> Result<PathBuf> {
    if raw != "~" && !raw.starts_with("~/") {
        return Ok(PathBuf::from(raw));
    }
    let home = home.ok_or_else(|| AppError::Config("cannot determine home directory".into()))?;
    if raw == "~" {
        Ok(home.to_path_buf())
    } else {
        Ok(home.join(&raw[2..]))
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                notesdir: other.general.notesdir.clone().or(self.general.notesdir),
                editor: other.general.editor.clone().or(self.general.editor),
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        let mut config = AppConfig::default();

        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in candidate_paths().iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    /// Configured editor name, or the default.
    pub fn editor(&self) -> &str {
        self.general
            .editor
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_EDITOR)
    }

    /// Effective notes directory: `notesdir` with `~` expanded, else `~/notes`.
    /// Always absolute; a relative `notesdir` is taken from the current directory.
    pub fn notes_root(&self) -> Result<PathBuf> {
        self.notes_root_with_home(dirs::home_dir().as_deref())
    }

    fn notes_root_with_home(&self, home: Option<&Path>) -> Result<PathBuf> {
        let root = match self.general.notesdir.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => expand_tilde(raw, home)?,
            _ => home
                .map(|h| h.join(DEFAULT_NOTES_SUBDIR))
                .ok_or_else(|| AppError::Config("cannot determine home directory".into()))?,
        };
        std::path::absolute(&root).map_err(|e| {
            AppError::Config(format!("cannot resolve notes directory {}: {e}", root.display()))
        })
    }
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// Where the running app reads its current configuration from.
///
/// Consulted again right before opening a file so a changed `notesdir` is
/// honoured.
pub trait ConfigSource {
    fn current(&self) -> AppConfig;
}

/// Files on disk layered under CLI overrides; re-read on every call.
#[derive(Debug, Clone, Default)]
pub struct LayeredConfig {
    cli_config_path: Option<PathBuf>,
    cli_overrides: AppConfig,
}

impl LayeredConfig {
    pub fn new(cli_config_path: Option<PathBuf>, cli_overrides: AppConfig) -> Self {
        Self {
            cli_config_path,
            cli_overrides,
        }
    }
}

impl ConfigSource for LayeredConfig {
    fn current(&self) -> AppConfig {
        AppConfig::load(self.cli_config_path.as_deref(), Some(&self.cli_overrides))
    }
}

impl ConfigSource for AppConfig {
    fn current(&self) -> AppConfig {
        self.clone()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.editor(), "vim");
        let root = cfg.notes_root_with_home(Some(Path::new("/home/u"))).unwrap();
        assert_eq!(root, PathBuf::from("/home/u/notes"));
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
notesdir = "~/docs/notes"
editor = "nvim"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.editor(), "nvim");
        let root = cfg.notes_root_with_home(Some(Path::new("/home/u"))).unwrap();
        assert_eq!(root, PathBuf::from("/home/u/docs/notes"));
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_default_template_parses() {
        let cfg: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).expect("parse failed");
        assert_eq!(cfg.general.notesdir.as_deref(), Some("~/notes"));
        assert_eq!(cfg.editor(), "vim");
    }

    #[test]
    fn test_blank_editor_falls_back() {
        let cfg = AppConfig {
            general: GeneralConfig {
                editor: Some("   ".into()),
                ..Default::default()
            },
        };
        assert_eq!(cfg.editor(), "vim");
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                notesdir: Some("/base/notes".into()),
                editor: Some("nano".into()),
            },
        };
        let over = AppConfig {
            general: GeneralConfig {
                editor: Some("hx".into()),
                // notesdir not set, so the base value stays
                ..Default::default()
            },
        };

        let merged = base.merge(&over);
        assert_eq!(merged.editor(), "hx");
        assert_eq!(merged.general.notesdir.as_deref(), Some("/base/notes"));
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            general: GeneralConfig {
                notesdir: Some("/kept".into()),
                editor: Some("emacs".into()),
            },
        };
        let merged = base.clone().merge(&AppConfig::default());
        assert_eq!(merged, base);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[general]
notesdir = "/srv/notes"
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.notes_root().unwrap(), PathBuf::from("/srv/notes"));
        assert_eq!(cfg.editor(), "vim");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_file(Path::new("/nonexistent/config.toml")).is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        fs::write(&cfg_path, "this is { not valid toml").expect("write");
        assert!(load_file(&cfg_path).is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        fs::write(
            &cfg_path,
            r#"
[general]
notesdir = "/from/file"
editor = "nano"
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            general: GeneralConfig {
                editor: Some("nvim".into()),
                ..Default::default()
            },
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        assert_eq!(cfg.editor(), "nvim");
        assert_eq!(cfg.general.notesdir.as_deref(), Some("/from/file"));
    }

    #[test]
    fn test_layered_config_rereads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "[general]\nnotesdir = \"/first\"\n").expect("write");

        let source = LayeredConfig::new(Some(cfg_path.clone()), AppConfig::default());
        assert_eq!(source.current().notes_root().unwrap(), PathBuf::from("/first"));

        fs::write(&cfg_path, "[general]\nnotesdir = \"/second\"\n").expect("write");
        assert_eq!(source.current().notes_root().unwrap(), PathBuf::from("/second"));
    }

    #[test]
    fn test_relative_notesdir_is_absolute() {
        let cwd = std::env::current_dir().expect("cwd");
        for raw in ["notes", "."] {
            let cfg = AppConfig {
                general: GeneralConfig {
                    notesdir: Some(raw.into()),
                    ..Default::default()
                },
            };
            let root = cfg.notes_root_with_home(None).expect("root");
            assert!(root.is_absolute(), "{raw}");
            assert!(root.starts_with(&cwd), "{raw}");
        }
    }

    #[test]
    fn test_expand_tilde() {
        let home = Some(Path::new("/home/u"));
        assert_eq!(expand_tilde("~", home).unwrap(), PathBuf::from("/home/u"));
        assert_eq!(expand_tilde("~/n", home).unwrap(), PathBuf::from("/home/u/n"));
        assert_eq!(expand_tilde("~other/n", home).unwrap(), PathBuf::from("~other/n"));
        assert_eq!(expand_tilde("/abs", None).unwrap(), PathBuf::from("/abs"));
        assert!(matches!(expand_tilde("~/n", None), Err(AppError::Config(_))));
    }

    #[test]
    fn test_ensure_config_creates_private_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("nnav").join("config.toml");

        ensure_config_at(&cfg_path).expect("ensure");
        let written = fs::read_to_string(&cfg_path).expect("read");
        assert_eq!(written, DEFAULT_CONFIG_TEMPLATE);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&cfg_path).expect("meta").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_ensure_config_keeps_existing_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        fs::write(&cfg_path, "[general]\neditor = \"hx\"\n").expect("write");

        ensure_config_at(&cfg_path).expect("ensure");
        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.editor(), "hx");
    }
}
