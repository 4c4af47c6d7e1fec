//! Configuration loading from environment variables.

use crate::duplicate::ImageMatchPolicy;
use crate::naming::KeyScheme;
use crate::{
    AppError, MatchMode, DEFAULT_BUCKET, DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TABLE,
};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Which storage backend the application talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Hosted table + object storage over HTTPS.
    #[default]
    Hosted,
    /// In-process store; contents are lost on exit.
    Memory,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hosted => "hosted",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hosted" | "remote" => Ok(Self::Hosted),
            "memory" | "in-memory" | "mem" => Ok(Self::Memory),
            other => Err(format!(
                "unknown backend '{}'; expected 'hosted' or 'memory'",
                other
            )),
        }
    }
}

/// Runtime configuration for pairstore.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    /// Hosted service base URL, e.g. `https://project.example.co`.
    pub base_url: Option<String>,
    /// Hosted service API key, sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    pub bucket: String,
    pub table: String,
    pub port: u16,
    pub max_upload_size: usize,
    pub request_timeout_secs: u64,
    pub key_scheme: KeyScheme,
    pub duplicate_image_match: ImageMatchPolicy,
    pub lookup_match: MatchMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            base_url: None,
            api_key: None,
            bucket: DEFAULT_BUCKET.to_string(),
            table: DEFAULT_TABLE.to_string(),
            port: DEFAULT_PORT,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            key_scheme: KeyScheme::default(),
            duplicate_image_match: ImageMatchPolicy::default(),
            lookup_match: MatchMode::default(),
        }
    }
}

/// Parse a boolean-like environment flag value.
///
/// # Supported Values
/// - Truthy: `1`, `true`, `yes`, `on`
/// - Falsy: `0`, `false`, `no`, `off`, empty string
///
/// Matching is case-insensitive and ignores surrounding whitespace.
pub fn parse_env_flag(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Read a boolean flag from the environment.
///
/// Missing or unrecognized values are treated as `false`.
pub fn env_flag_enabled(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_env_flag(&value))
        .unwrap_or(false)
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env_nonempty(name) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("Invalid {}='{}': {}. Falling back to {}", name, raw, err, default);
                default
            }
        },
        None => default,
    }
}

fn env_choice_or<T>(name: &str, default: T) -> T
where
    T: FromStr<Err = String> + Copy + std::fmt::Debug,
{
    match env_nonempty(name) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|err| {
            tracing::warn!("Invalid {}: {}. Falling back to {:?}", name, err, default);
            default
        }),
        None => default,
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env_choice_or("PAIRSTORE_BACKEND", defaults.backend),
            base_url: env_nonempty("PAIRSTORE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            api_key: env_nonempty("PAIRSTORE_KEY"),
            bucket: env_nonempty("PAIRSTORE_BUCKET").unwrap_or(defaults.bucket),
            table: env_nonempty("PAIRSTORE_TABLE").unwrap_or(defaults.table),
            port: env_parse_or("PORT", defaults.port),
            max_upload_size: env_parse_or("MAX_UPLOAD_SIZE", defaults.max_upload_size),
            request_timeout_secs: env_parse_or(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            key_scheme: env_choice_or("KEY_SCHEME", defaults.key_scheme),
            duplicate_image_match: env_choice_or(
                "DUPLICATE_IMAGE_MATCH",
                defaults.duplicate_image_match,
            ),
            lookup_match: env_choice_or("LOOKUP_MATCH", defaults.lookup_match),
        }
    }

    /// Per-call timeout for backend operations.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Check that the selected backend has everything it needs.
    ///
    /// # Errors
    /// Returns [`AppError::Validation`] when the hosted backend is selected
    /// without a base URL or API key, or when the URL is not http(s).
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bucket.trim().is_empty() || self.table.trim().is_empty() {
            return Err(AppError::Validation(
                "PAIRSTORE_BUCKET and PAIRSTORE_TABLE must not be empty".to_string(),
            ));
        }
        if self.backend == BackendKind::Memory {
            return Ok(());
        }
        let Some(base_url) = self.base_url.as_deref() else {
            return Err(AppError::Validation(
                "PAIRSTORE_URL is required for the hosted backend".to_string(),
            ));
        };
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Validation(format!(
                "PAIRSTORE_URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }
        if self.api_key.is_none() {
            return Err(AppError::Validation(
                "PAIRSTORE_KEY is required for the hosted backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL used when building public object URLs.
    ///
    /// The memory backend has no real host, so a stable placeholder keeps
    /// generated URLs well-formed.
    pub fn public_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_env_flag, BackendKind, Config};
    use crate::duplicate::ImageMatchPolicy;
    use crate::env::{env_lock, EnvGuard};
    use crate::naming::KeyScheme;
    use crate::{MatchMode, DEFAULT_BUCKET, DEFAULT_PORT};

    const CONFIG_VARS: &[&str] = &[
        "PAIRSTORE_BACKEND",
        "PAIRSTORE_URL",
        "PAIRSTORE_KEY",
        "PAIRSTORE_BUCKET",
        "PAIRSTORE_TABLE",
        "PORT",
        "MAX_UPLOAD_SIZE",
        "REQUEST_TIMEOUT_SECS",
        "KEY_SCHEME",
        "DUPLICATE_IMAGE_MATCH",
        "LOOKUP_MATCH",
    ];

    fn cleared_env() -> Vec<EnvGuard> {
        CONFIG_VARS.iter().map(|key| EnvGuard::remove(key)).collect()
    }

    #[test]
    fn parse_env_flag_accepts_truthy_values() {
        for value in ["1", "true", "TRUE", " yes ", "on"] {
            assert_eq!(parse_env_flag(value), Some(true), "value: {}", value);
        }
    }

    #[test]
    fn parse_env_flag_accepts_falsy_values() {
        for value in ["", "0", "false", "FALSE", " no ", "off"] {
            assert_eq!(parse_env_flag(value), Some(false), "value: {}", value);
        }
    }

    #[test]
    fn parse_env_flag_rejects_unknown_values() {
        assert_eq!(parse_env_flag("maybe"), None);
        assert_eq!(parse_env_flag("enabled"), None);
    }

    #[test]
    fn from_env_applies_defaults() {
        let _lock = env_lock().lock().expect("env lock");
        let _cleared = cleared_env();
        let config = Config::from_env();
        assert_eq!(config.backend, BackendKind::Hosted);
        assert_eq!(config.bucket, DEFAULT_BUCKET);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.key_scheme, KeyScheme::Timestamped);
        assert_eq!(config.duplicate_image_match, ImageMatchPolicy::ExactName);
        assert_eq!(config.lookup_match, MatchMode::CaseInsensitive);
        assert!(config.validate().is_err(), "hosted backend needs URL and key");
    }

    #[test]
    fn from_env_reads_overrides_and_ignores_invalid_values() {
        let _lock = env_lock().lock().expect("env lock");
        let _cleared = cleared_env();
        let _guards = [
            EnvGuard::set("PAIRSTORE_URL", "https://project.example.co/"),
            EnvGuard::set("PAIRSTORE_KEY", "anon-key"),
            EnvGuard::set("PORT", "not-a-port"),
            EnvGuard::set("REQUEST_TIMEOUT_SECS", "3"),
            EnvGuard::set("KEY_SCHEME", "public"),
            EnvGuard::set("DUPLICATE_IMAGE_MATCH", "substring"),
            EnvGuard::set("LOOKUP_MATCH", "sideways"),
        ];
        let config = Config::from_env();
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://project.example.co")
        );
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.request_timeout().as_secs(), 3);
        assert_eq!(config.key_scheme, KeyScheme::Public);
        assert_eq!(config.duplicate_image_match, ImageMatchPolicy::Substring);
        assert_eq!(config.lookup_match, MatchMode::CaseInsensitive);
        config.validate().expect("hosted config should validate");
    }

    #[test]
    fn validate_matrix() {
        let memory = Config {
            backend: BackendKind::Memory,
            ..Config::default()
        };
        memory.validate().expect("memory backend needs no credentials");

        let bad_scheme = Config {
            base_url: Some("ftp://example.co".to_string()),
            api_key: Some("key".to_string()),
            ..Config::default()
        };
        assert!(bad_scheme.validate().is_err());

        let missing_key = Config {
            base_url: Some("https://example.co".to_string()),
            ..Config::default()
        };
        assert!(missing_key.validate().is_err());
    }
}
