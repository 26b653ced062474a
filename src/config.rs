use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::schema::FieldMap;

const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_key: String,
    pub spreadsheet_id: String,
    pub range: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sheets: SheetsConfig,
    /// How long a fetched snapshot is reused. Zero refetches on every command.
    pub snapshot_ttl: Duration,
    pub top_limit: usize,
    pub preferences_path: PathBuf,
    pub fields: FieldMap,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(name) {
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name,
                    value: raw.clone(),
                }),
                None => Ok(default),
            }
        };

        let sheets = SheetsConfig {
            api_key: required("GOOGLE_SHEETS_API_KEY")?,
            spreadsheet_id: required("GOOGLE_SPREADSHEET_ID")?,
            range: required("GOOGLE_SPREADSHEET_RANGE")?,
            base_url: lookup("KVK_SHEETS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SHEETS_BASE_URL.to_string()),
            timeout: Duration::from_secs(number("KVK_HTTP_TIMEOUT_SECS", 10)?),
        };

        let mut fields = FieldMap::kvk_v1();
        fields.goals.kill_override = lookup("KVK_KILL_OVERRIDE_FIELD").filter(|v| !v.is_empty());
        fields.goals.dead_override = lookup("KVK_DEAD_OVERRIDE_FIELD").filter(|v| !v.is_empty());

        Ok(Self {
            sheets,
            snapshot_ttl: Duration::from_secs(number("KVK_SNAPSHOT_TTL_SECS", 0)?),
            top_limit: number("KVK_TOP_LIMIT", 100)? as usize,
            preferences_path: lookup("KVK_PREFERENCES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| default_data_dir().join("preferences.json")),
            fields,
        })
    }
}

pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA").unwrap_or_else(|_| String::from("."));
        return PathBuf::from(base).join("kvkbot");
    }

    env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kvkbot")
}

/// Log directory, readable before the rest of the configuration is validated.
pub fn log_dir() -> PathBuf {
    env::var_os("KVK_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| default_data_dir().join("logs"))
}
