//! TOML-based configuration for Quarry.
//!
//! Supports a config file (quarry.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [fetch]
//! max_depth = 8
//! hidden_placeholder = "??"
//! function_error = "Problem with function field"
//!
//! [format]
//! date = "%Y-%m-%d"
//! datetime = "%Y-%m-%d %H:%M"
//! true_label = "Yes"
//! false_label = "No"
//!
//! [log]
//! filter = "quarry=info"
//!
//! [data]
//! path = "${QUARRY_HOME}/crm.json"
//! ```

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder for values derived from an entity the viewer may not see.
pub const HIDDEN_VALUE: &str = "??";

/// Cell text for a function field whose provider failed.
pub const FUNCTION_FIELD_ERROR: &str = "Problem with function field";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub format: FormatSettings,
    pub log: LogSettings,
    pub data: DataSettings,
}

/// Fetch engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Maximum sub-report nesting followed during one fetch.
    pub max_depth: usize,

    /// Text shown instead of a value derived from a hidden entity.
    pub hidden_placeholder: String,

    /// Text shown when a function field cannot be computed.
    pub function_error: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_depth: 8,
            hidden_placeholder: HIDDEN_VALUE.to_string(),
            function_error: FUNCTION_FIELD_ERROR.to_string(),
        }
    }
}

/// Display formatting of raw values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatSettings {
    /// chrono format string for dates.
    pub date: String,

    /// chrono format string for datetimes.
    pub datetime: String,

    pub true_label: String,
    pub false_label: String,

    /// Maximum number of decimals shown for decimal values.
    pub decimals: usize,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            date: "%Y-%m-%d".to_string(),
            datetime: "%Y-%m-%d %H:%M:%S".to_string(),
            true_label: "Yes".to_string(),
            false_label: "No".to_string(),
            decimals: 2,
        }
    }
}

/// Logging configuration for the binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "quarry=warn".to_string(),
        }
    }
}

/// Where the CLI reads its dataset from when no path is given.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSettings {
    /// Dataset path (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl DataSettings {
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `QUARRY_CONFIG`
    /// 2. `./quarry.toml`
    /// 3. `~/.config/quarry/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("QUARRY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("quarry.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("quarry").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.fetch.max_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "fetch.max_depth must be at least 1".to_string(),
            ));
        }
        check_time_format("format.date", &self.format.date)?;
        check_time_format("format.datetime", &self.format.datetime)?;
        Ok(())
    }
}

/// Reject strftime strings chrono cannot render.
fn check_time_format(key: &str, fmt: &str) -> Result<(), SettingsError> {
    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(SettingsError::InvalidConfig(format!(
            "{} is not a valid date format: '{}'",
            key, fmt
        )));
    }
    Ok(())
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut var_name = String::new();
        while let Some(ch) = chars.next_if(|ch| {
            if braced {
                *ch != '}'
            } else {
                ch.is_alphanumeric() || *ch == '_'
            }
        }) {
            var_name.push(ch);
        }
        if braced {
            chars.next_if_eq(&'}');
        }

        if var_name.is_empty() && !braced {
            // Just a lone $, keep it
            result.push('$');
            continue;
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
