//! Process settings read from the environment

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const TOKEN_VAR: &str = "DISCORD_TOKEN";
pub const DATA_FILE_VAR: &str = "HONEYPOT_DATA_FILE";
pub const LOG_DIR_VAR: &str = "HONEYPOT_LOG_DIR";

pub const DEFAULT_DATA_FILE: &str = "data/honeypot.yaml";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub token: String,
    pub data_file: PathBuf,
    pub log_dir: PathBuf,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("token", &"<redacted>")
            .field("data_file", &self.data_file)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment
    ///
    /// # Errors
    /// Returns an error if the bot token is missing
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    /// Returns an error if the bot token is missing
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let token = read(TOKEN_VAR).ok_or(SettingsError::Missing(TOKEN_VAR))?;
        let data_file = read(DATA_FILE_VAR).map_or_else(|| DEFAULT_DATA_FILE.into(), PathBuf::from);
        let log_dir = read(LOG_DIR_VAR).map_or_else(|| DEFAULT_LOG_DIR.into(), PathBuf::from);

        Ok(Self {
            token,
            data_file,
            log_dir,
        })
    }
}
