//! Runtime configuration, read from the environment (and `.env` if present).

use crate::polling::PollPolicy;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub google_maps_api_key: Option<String>,
    pub poll: PollPolicy,
    pub location_throttle: Duration,
}

impl Config {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let seconds = |key: &'static str, default: Duration| match lookup(key) {
            None => Ok(default),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(ConfigError::Invalid { key, value }),
            },
        };

        let defaults = PollPolicy::default();
        Ok(Self {
            supabase_url: required("SUPABASE_URL")?,
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            google_maps_api_key: lookup("GOOGLE_MAPS_API_KEY").filter(|v| !v.is_empty()),
            poll: PollPolicy {
                order: seconds("ORDER_POLL_SECS", defaults.order)?,
                list: seconds("LIST_POLL_SECS", defaults.list)?,
                tracking: seconds("TRACKING_POLL_SECS", defaults.tracking)?,
            },
            location_throttle: seconds(
                "LOCATION_THROTTLE_SECS",
                crate::tracking::MIN_UPLOAD_INTERVAL,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.poll, PollPolicy::default());
        assert_eq!(config.location_throttle, Duration::from_secs(20));
        assert_eq!(config.google_maps_api_key, None);
    }

    #[test]
    fn missing_and_invalid_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[("SUPABASE_URL", "https://abc.supabase.co")])),
            Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
        );
        assert_eq!(
            Config::from_lookup(lookup(&[
                ("SUPABASE_URL", "https://abc.supabase.co"),
                ("SUPABASE_ANON_KEY", "anon"),
                ("ORDER_POLL_SECS", "soon"),
            ])),
            Err(ConfigError::Invalid {
                key: "ORDER_POLL_SECS",
                value: "soon".into()
            })
        );
    }

    #[test]
    fn overrides_are_read() {
        let config = Config::from_lookup(lookup(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("ORDER_POLL_SECS", "5"),
            ("GOOGLE_MAPS_API_KEY", "maps"),
        ]))
        .unwrap();
        assert_eq!(config.poll.order, Duration::from_secs(5));
        assert_eq!(config.google_maps_api_key.as_deref(), Some("maps"));
    }
}
