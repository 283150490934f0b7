//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! A single user-level TOML file seeds the defaults the host application
//! places into the state container: git settings, author identity and the
//! location of the virtual filesystem store. Everything else (credentials,
//! workspace path, open buffers) is owned by the host.
//!
//! # Precedence
//!
//! 1. Default values
//! 2. Config file
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$EGIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/egit/config.toml`
//! 3. `~/.egit/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use editor_git::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("auto-fetch: {}", config.git_settings().auto_fetch);
//! println!("author: {}", config.author().name);
//! ```

pub mod schema;

pub use schema::{
    default_author, AuthorConfig, FileConfig, GitSettings, GitSettingsConfig, StorageConfig,
    DEFAULT_CORS_PROXY,
};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::Author;

/// Number of commits loaded by `fetch_commit_log` when no limit is given.
pub const DEFAULT_COMMIT_LOG_LIMIT: usize = 50;

/// Remote used when none is named.
pub const DEFAULT_REMOTE: &str = "origin";

/// Branch created by `initialize_repository`.
pub const DEFAULT_BRANCH: &str = "main";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: FileConfig,
    /// Path the file was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file.
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("EGIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("egit/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".egit/config.toml"))
            .filter(|path| path.exists())
    }

    /// Path this config was loaded from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessors with defaults applied
    // =========================================================================

    /// Effective git settings.
    pub fn git_settings(&self) -> GitSettings {
        let mut settings = GitSettings::default();
        if let Some(git) = &self.file.git {
            if let Some(v) = git.auto_fetch {
                settings.auto_fetch = v;
            }
            if let Some(v) = git.auto_fetch_interval_ms {
                settings.auto_fetch_interval = v;
            }
            if let Some(v) = git.show_untracked {
                settings.show_untracked = v;
            }
            if let Some(v) = git.show_ignored {
                settings.show_ignored = v;
            }
            if let Some(v) = &git.cors_proxy {
                settings.cors_proxy = Some(v.clone());
            }
        }
        settings
    }

    /// Effective author identity.
    pub fn author(&self) -> Author {
        let mut author = default_author();
        if let Some(configured) = &self.file.author {
            if let Some(name) = &configured.name {
                author.name = name.clone();
            }
            if let Some(email) = &configured.email {
                author.email = email.clone();
            }
        }
        author
    }

    /// Directory holding virtual workspace stores.
    ///
    /// Defaults to `<data_local_dir>/egit/virtual`, or a directory under the
    /// system temp dir when no data dir is known.
    pub fn virtual_root(&self) -> PathBuf {
        self.file
            .storage
            .as_ref()
            .and_then(|s| s.virtual_root.clone())
            .or_else(|| dirs::data_local_dir().map(|d| d.join("egit/virtual")))
            .unwrap_or_else(|| std::env::temp_dir().join("egit/virtual"))
    }

    /// Override the virtual store root (used by tests and embedders).
    pub fn with_virtual_root(mut self, root: impl Into<PathBuf>) -> Self {
        let storage = self.file.storage.get_or_insert_with(StorageConfig::default);
        storage.virtual_root = Some(root.into());
        self
    }
}
