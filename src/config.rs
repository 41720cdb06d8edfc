// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings are loaded from the environment (optionally seeded from a `.env`
//! file) once at startup, validated, and then shared read-only for the
//! lifetime of the process.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SECRET_KEY` | JWT signing secret (at least 32 characters) | Required |
//! | `JWT_ALGORITHM` | JWT signing algorithm (`HS256`, `HS384`, `HS512`) | `HS256` |
//! | `ACCESS_TOKEN_EXPIRE_MINUTES` | Access token lifetime (at most 1440) | `15` |
//! | `REFRESH_TOKEN_EXPIRE_DAYS` | Refresh token lifetime (at most 365) | `30` |
//! | `BOT_TOKEN` | Telegram bot token used to verify login payloads | empty |
//! | `AUTH_EXCLUDED_PATHS` | Comma-separated path prefixes served without auth | `/auth,/public,/docs,/openapi.json,/health` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | `*` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;

pub const SECRET_KEY_ENV: &str = "SECRET_KEY";
pub const JWT_ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const ACCESS_TOKEN_EXPIRE_MINUTES_ENV: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
pub const REFRESH_TOKEN_EXPIRE_DAYS_ENV: &str = "REFRESH_TOKEN_EXPIRE_DAYS";
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const AUTH_EXCLUDED_PATHS_ENV: &str = "AUTH_EXCLUDED_PATHS";
pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Minimum accepted length of `SECRET_KEY`.
pub const MIN_SECRET_KEY_LENGTH: usize = 32;

/// Placeholder secrets that are rejected regardless of length.
pub const INSECURE_SECRET_KEYS: &[&str] = &["changeme", "secret", "your-secret-key", ""];

pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 30;

const ROOT_PATH: &str = "/";

/// Upper bound for `ACCESS_TOKEN_EXPIRE_MINUTES` (one day).
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 24 * 60;
/// Upper bound for `REFRESH_TOKEN_EXPIRE_DAYS` (one year).
pub const MAX_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 365;

/// Path prefixes that skip the authentication middleware by default.
pub const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/auth", "/public", "/docs", "/openapi.json", "/health"];

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

/// Fatal configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("SECRET_KEY has an insecure default value, generate a secure random key")]
    InsecureSecretKey,

    #[error("SECRET_KEY must be at least {minimum} characters long (got {actual})")]
    SecretKeyTooShort { actual: usize, minimum: usize },

    #[error("unsupported JWT algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "" => Ok(LogFormat::Pretty),
            other => Err(ConfigurationError::Invalid {
                name: LOG_FORMAT_ENV,
                reason: format!("unknown format '{other}'"),
            }),
        }
    }
}

/// Validate a JWT signing secret.
pub fn validate_secret_key(secret_key: Option<&str>) -> Result<&str, ConfigurationError> {
    let secret_key = secret_key.ok_or(ConfigurationError::Missing(SECRET_KEY_ENV))?;

    if INSECURE_SECRET_KEYS.contains(&secret_key) {
        return Err(ConfigurationError::InsecureSecretKey);
    }

    let actual = secret_key.chars().count();
    if actual < MIN_SECRET_KEY_LENGTH {
        return Err(ConfigurationError::SecretKeyTooShort {
            actual,
            minimum: MIN_SECRET_KEY_LENGTH,
        });
    }

    Ok(secret_key)
}

/// Parse a JWT algorithm tag, accepting only the HMAC family.
pub fn parse_algorithm(tag: &str) -> Result<Algorithm, ConfigurationError> {
    let algorithm = Algorithm::from_str(tag.trim())
        .map_err(|_| ConfigurationError::UnsupportedAlgorithm(tag.to_string()))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        _ => Err(ConfigurationError::UnsupportedAlgorithm(tag.to_string())),
    }
}

/// Authentication settings consumed by the token service, the signature
/// validator and the middleware.
///
/// Constructing one validates the secret; nothing downstream re-validates.
#[derive(Clone)]
pub struct AuthSettings {
    secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub bot_token: String,
    pub excluded_paths: Vec<String>,
}

impl AuthSettings {
    /// Create settings with default algorithm, lifetimes and excluded paths.
    pub fn new(
        secret_key: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let secret_key = secret_key.into();
        validate_secret_key(Some(&secret_key))?;

        Ok(Self {
            secret_key,
            algorithm: Algorithm::HS256,
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS),
            bot_token: bot_token.into(),
            excluded_paths: DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
        })
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    pub fn with_excluded_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// The JWT signing secret.
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// Whether `path` is the root or starts with one of the excluded prefixes.
    ///
    /// The root is matched exactly; it never exempts the paths below it.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        path == ROOT_PATH
            || self
                .excluded_paths
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret_key_length", &self.secret_key.len())
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("bot_token_configured", &!self.bot_token.is_empty())
            .field("excluded_paths", &self.excluded_paths)
            .finish()
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub auth: AuthSettings,
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        // A missing .env file is fine; real deployments set the environment directly.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup(SECRET_KEY_ENV);
        let secret_key = validate_secret_key(secret_key.as_deref())?.to_string();

        let algorithm = match lookup(JWT_ALGORITHM_ENV) {
            Some(tag) => parse_algorithm(&tag)?,
            None => Algorithm::HS256,
        };

        let access_minutes = parse_bounded(
            &lookup,
            ACCESS_TOKEN_EXPIRE_MINUTES_ENV,
            DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
            MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
        )?;
        let access_token_ttl =
            Duration::try_minutes(access_minutes).ok_or(ConfigurationError::Invalid {
                name: ACCESS_TOKEN_EXPIRE_MINUTES_ENV,
                reason: "out of range".to_string(),
            })?;

        let refresh_days = parse_bounded(
            &lookup,
            REFRESH_TOKEN_EXPIRE_DAYS_ENV,
            DEFAULT_REFRESH_TOKEN_EXPIRE_DAYS,
            MAX_REFRESH_TOKEN_EXPIRE_DAYS,
        )?;
        let refresh_token_ttl =
            Duration::try_days(refresh_days).ok_or(ConfigurationError::Invalid {
                name: REFRESH_TOKEN_EXPIRE_DAYS_ENV,
                reason: "out of range".to_string(),
            })?;

        let bot_token = lookup(BOT_TOKEN_ENV).unwrap_or_default();

        let excluded_paths = match lookup(AUTH_EXCLUDED_PATHS_ENV) {
            Some(raw) => split_list(&raw),
            None => DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()).collect(),
        };

        let cors_origins = split_list(&lookup(CORS_ORIGINS_ENV).unwrap_or_else(|| "*".to_string()));

        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigurationError::Invalid {
                name: PORT_ENV,
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            auth: AuthSettings {
                secret_key,
                algorithm,
                access_token_ttl,
                refresh_token_ttl,
                bot_token,
                excluded_paths,
            },
            cors_origins,
            host,
            port,
            log_format,
        })
    }

    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bounded<F>(
    lookup: &F,
    name: &'static str,
    default: i64,
    max: i64,
) -> Result<i64, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 && value <= max => Ok(value),
        Ok(value) if value > max => Err(ConfigurationError::Invalid {
            name,
            reason: format!("{value} exceeds the maximum of {max}"),
        }),
        _ => Err(ConfigurationError::Invalid {
            name,
            reason: format!("'{raw}' is not a positive integer"),
        }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) const TEST_SECRET_KEY: &str = "test-secret-key-minimum-32-characters-long-for-testing";

#[cfg(test)]
pub(crate) const TEST_BOT_TOKEN: &str = "123456789:ABCdefGHIjklMNOpqrsTUVwxyz123456789";

#[cfg(test)]
impl AuthSettings {
    pub(crate) fn for_tests() -> Self {
        AuthSettings::new(TEST_SECRET_KEY, TEST_BOT_TOKEN).unwrap()
    }
}
