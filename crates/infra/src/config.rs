//! Process configuration from environment variables.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

use stockroute_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 24 * 60;
const DEV_JWT_SECRET: &str = "stockroute-dev-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl core::fmt::Display) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// `None` selects the in-memory backend.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

// Secrets stay out of logs.
impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl", &self.token_ttl)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Read `BIND_ADDR`, `JWT_SECRET`, `TOKEN_TTL_MINUTES`, `DATABASE_URL`
    /// and `LOG_FORMAT` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", &bind_raw, e))?;

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET is not set; using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let token_ttl = match get("TOKEN_TTL_MINUTES") {
            Some(raw) => {
                let minutes = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| ConfigError::invalid("TOKEN_TTL_MINUTES", &raw, e))?;
                if minutes <= 0 {
                    return Err(ConfigError::invalid(
                        "TOKEN_TTL_MINUTES",
                        &raw,
                        "must be positive",
                    ));
                }
                chrono::Duration::try_minutes(minutes).ok_or_else(|| {
                    ConfigError::invalid("TOKEN_TTL_MINUTES", &raw, "out of range")
                })?
            }
            None => chrono::Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| ConfigError::invalid("LOG_FORMAT", &raw, e))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl,
            database_url: get("DATABASE_URL"),
            log_format,
        })
    }
}
