use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Context hunted when a message names none.
pub const DEFAULT_CONTEXT: &str = "default";
/// Context used when the named one does not exist.
pub const FALLBACK_CONTEXT: &str = "global";
/// Forwarding budget written to messages that carry no counter.
pub const DEFAULT_MAX_FORWARDS: u32 = 70;

/// Interpreter settings.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```
/// use chatplan::Settings;
///
/// let settings = Settings::from_toml_str("max_forwards = 10").unwrap();
/// assert_eq!(settings.max_forwards, 10);
/// assert_eq!(settings.default_context, "default");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_context: String,
    pub fallback_context: String,
    pub max_forwards: u32,
    /// Chatplan file loaded by [`FileSource::from_settings`](crate::FileSource::from_settings).
    pub chatplan_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_context: DEFAULT_CONTEXT.to_owned(),
            fallback_context: FALLBACK_CONTEXT.to_owned(),
            max_forwards: DEFAULT_MAX_FORWARDS,
            chatplan_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Settings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] on malformed TOML or mistyped keys.
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(input)?)
    }

    /// Read and parse a TOML settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] on I/O or parse failure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}
