//! Environment-variable helpers shared by the settings types of every
//! crate.

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Read a required variable.
pub fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

/// Read and parse `var`, falling back to `default` when unset.
pub fn parse_or<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => parse_value(var, &raw),
        Err(_) => Ok(default),
    }
}

/// Read a whole number of seconds as a [`Duration`]. Zero is rejected.
pub fn secs_or(var: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_or(var, default_secs)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: "0".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}

/// Split a comma-separated list, dropping blanks. Order and duplicates
/// are kept.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
