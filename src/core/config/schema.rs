//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Config File
//!
//! Located at (in order of precedence):
//! 1. `$EGIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/egit/config.toml`
//! 3. `~/.egit/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Config values are validated after parsing (e.g., the auto-fetch interval
//! must be positive, the proxy must be an http(s) URL).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::Author;

/// CORS relay used when `git.cors_proxy` is unset or blank.
pub const DEFAULT_CORS_PROXY: &str = "https://cors.isomorphic-git.org";

/// Default author name when none is configured.
pub const DEFAULT_AUTHOR_NAME: &str = "Editor User";

/// Default author email when none is configured.
pub const DEFAULT_AUTHOR_EMAIL: &str = "user@editor.local";

/// Default auto-fetch period: five minutes.
pub const DEFAULT_AUTO_FETCH_INTERVAL_MS: u64 = 300_000;

/// Global configuration file.
///
/// # Example
///
/// ```toml
/// [git]
/// auto_fetch = true
/// auto_fetch_interval_ms = 300000
/// cors_proxy = "https://cors.isomorphic-git.org"
///
/// [author]
/// name = "Ada"
/// email = "ada@example.com"
///
/// [storage]
/// virtual_root = "/var/lib/egit/virtual"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Git behavior settings
    pub git: Option<GitSettingsConfig>,

    /// Commit identity
    pub author: Option<AuthorConfig>,

    /// Backing storage for the virtual filesystem
    pub storage: Option<StorageConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(git) = &self.git {
            git.validate()?;
        }
        if let Some(author) = &self.author {
            author.validate()?;
        }
        Ok(())
    }
}

/// `[git]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitSettingsConfig {
    pub auto_fetch: Option<bool>,
    pub auto_fetch_interval_ms: Option<u64>,
    pub show_untracked: Option<bool>,
    pub show_ignored: Option<bool>,
    pub cors_proxy: Option<String>,
}

impl GitSettingsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_fetch_interval_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "auto_fetch_interval_ms must be greater than zero".to_string(),
            ));
        }

        if let Some(proxy) = self.cors_proxy.as_deref().map(str::trim) {
            if !proxy.is_empty() && !proxy.starts_with("http://") && !proxy.starts_with("https://")
            {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid cors_proxy '{}', must be an http(s) URL",
                    proxy
                )));
            }
        }

        Ok(())
    }
}

/// `[author]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl AuthorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "author name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid author email '{}'",
                    email
                )));
            }
        }
        Ok(())
    }
}

/// `[storage]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding one store per virtual workspace
    pub virtual_root: Option<PathBuf>,
}

/// Effective git settings, as read by the session through the state container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSettings {
    pub auto_fetch: bool,
    /// Period between background fetches, in milliseconds
    pub auto_fetch_interval: u64,
    pub show_untracked: bool,
    pub show_ignored: bool,
    /// CORS relay for HTTP transports; blank means the default relay
    pub cors_proxy: Option<String>,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            auto_fetch: true,
            auto_fetch_interval: DEFAULT_AUTO_FETCH_INTERVAL_MS,
            show_untracked: true,
            show_ignored: false,
            cors_proxy: Some(DEFAULT_CORS_PROXY.to_string()),
        }
    }
}

impl GitSettings {
    /// The proxy to use, falling back to [`DEFAULT_CORS_PROXY`].
    ///
    /// ```
    /// use editor_git::core::config::GitSettings;
    ///
    /// let settings = GitSettings { cors_proxy: Some("  ".into()), ..Default::default() };
    /// assert_eq!(settings.cors_proxy_or_default(), "https://cors.isomorphic-git.org");
    /// ```
    pub fn cors_proxy_or_default(&self) -> &str {
        match self.cors_proxy.as_deref().map(str::trim) {
            Some(proxy) if !proxy.is_empty() => proxy,
            _ => DEFAULT_CORS_PROXY,
        }
    }

    /// The auto-fetch period as a `Duration`.
    pub fn auto_fetch_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.auto_fetch_interval.max(1))
    }
}

/// The author used when nothing is configured.
pub fn default_author() -> Author {
    Author {
        name: DEFAULT_AUTHOR_NAME.to_string(),
        email: DEFAULT_AUTHOR_EMAIL.to_string(),
    }
}
