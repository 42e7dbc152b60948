//! Configuration module for Quarry.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, DataSettings, FetchSettings, FormatSettings, LogSettings, Settings,
    SettingsError, FUNCTION_FIELD_ERROR, HIDDEN_VALUE,
};
