use std::{env, path::PathBuf, time::Duration};

use untis_ics_core::{
    Credentials, Error, ProviderConfig, Result, providers::DEFAULT_TIMEOUT_SECS,
};

const REQUIRED_VARS: [&str; 5] = [
    "WEBUNTIS_SERVER",
    "WEBUNTIS_SCHOOL",
    "WEBUNTIS_USERNAME",
    "WEBUNTIS_PASSWORD",
    "ICAL_SECRET_PATH",
];

const DEFAULT_PORT: u16 = 3979;
const DEFAULT_UPDATE_MINUTES: u64 = 10;
const DEFAULT_FEED_PATH: &str = "timetable.ics";
const DEFAULT_CLIENT_NAME: &str = "untis-ics";
/// Secret paths shorter than this are easy to guess
const MIN_SECRET_LEN: usize = 16;
/// Paths served next to the feed; a secret equal to one would shadow it
const RESERVED_PATHS: [&str; 1] = ["health"];

/// Server settings read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub credentials: Credentials,
    /// Feed path without slashes; served at `/{secret}` and `/{secret}.ics`
    pub secret_path: String,
    pub port: u16,
    pub update_interval: Duration,
    pub feed_path: PathBuf,
    pub calendar_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value source; every missing required key is reported at once
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let secret_path = validate_secret_path(&required("ICAL_SECRET_PATH"))?;

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let minutes = parse_or(
            get("UPDATE_INTERVAL_MINUTES"),
            "UPDATE_INTERVAL_MINUTES",
            DEFAULT_UPDATE_MINUTES,
        )?;
        if minutes == 0 {
            return Err(Error::Config(
                "UPDATE_INTERVAL_MINUTES must be at least 1".to_string(),
            ));
        }
        let timeout = parse_or(
            get("WEBUNTIS_TIMEOUT_SECS"),
            "WEBUNTIS_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?;

        Ok(Self {
            provider: ProviderConfig {
                server: required("WEBUNTIS_SERVER"),
                school: required("WEBUNTIS_SCHOOL"),
                client_name: get("WEBUNTIS_CLIENT")
                    .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
                timeout: Some(timeout),
            },
            credentials: Credentials {
                username: required("WEBUNTIS_USERNAME"),
                password: required("WEBUNTIS_PASSWORD"),
            },
            secret_path,
            port,
            update_interval: Duration::from_secs(minutes * 60),
            feed_path: get("ICAL_FILE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_FEED_PATH), PathBuf::from),
            calendar_name: get("ICAL_CALENDAR_NAME"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    value.map_or(Ok(default), |v| {
        v.parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: {v}")))
    })
}

/// Strip surrounding slashes and allow only characters that need no escaping in a URL
fn validate_secret_path(raw: &str) -> Result<String> {
    let secret = raw.trim_matches('/');
    if secret.is_empty() {
        return Err(Error::Config("ICAL_SECRET_PATH must not be empty".to_string()));
    }
    if !secret
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Config(
            "ICAL_SECRET_PATH may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    if RESERVED_PATHS.contains(&secret) {
        return Err(Error::Config(format!(
            "ICAL_SECRET_PATH must not be a built-in route: {secret}"
        )));
    }
    if secret.len() < MIN_SECRET_LEN {
        tracing::warn!(
            "ICAL_SECRET_PATH is shorter than {} characters and may be guessed",
            MIN_SECRET_LEN
        );
    }
    Ok(secret.to_string())
}
