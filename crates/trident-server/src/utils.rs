//! Utility functions for configuration and environment handling.

use std::env;
use std::str::FromStr;

/// Error type for environment variable parsing.
pub type EnvError = Box<dyn std::error::Error + Send + Sync>;

/// Read an environment variable, treating "not set" as `None`.
fn env_raw(name: &str) -> Result<Option<String>, EnvError> {
    match env::var(name) {
        Ok(v) => Ok(Some(v)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{name}: {e}").into()),
    }
}

/// Parse an environment variable as a boolean, with a default value.
///
/// Valid values (case-insensitive): "true", "1", "false", "0".
/// Returns an error for any other value to prevent misconfiguration.
///
/// # Errors
///
/// Returns an error if the environment variable is set to an invalid value,
/// or if the value contains invalid Unicode.
pub fn env_bool(name: &str, default: bool) -> Result<bool, EnvError> {
    let Some(value) = env_raw(name)? else {
        return Ok(default);
    };

    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!(
            "{name}: invalid value '{value}' (expected 'true', 'false', '1', or '0')"
        )
        .into()),
    }
}

/// Parse an environment variable with [`FromStr`], with a default value.
///
/// # Errors
///
/// Returns an error if the environment variable is set to a value that does
/// not parse, or if the value contains invalid Unicode.
pub fn env_parse<T>(name: &str, default: T) -> Result<T, EnvError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_raw(name)? {
        Some(value) => value
            .parse()
            .map_err(|e| format!("{name}: invalid value '{value}': {e}").into()),
        None => Ok(default),
    }
}

/// Read an environment variable as a string, with a default value.
///
/// # Errors
///
/// Returns an error if the value contains invalid Unicode.
pub fn env_string(name: &str, default: &str) -> Result<String, EnvError> {
    Ok(env_raw(name)?.unwrap_or_else(|| default.to_string()))
}
