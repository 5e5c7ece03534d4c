//! Configuration management
//!
//! Loads and validates configuration from environment variables, with
//! support for different environments (development, staging, production).

use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

use crate::auth::DEFAULT_CHALLENGE_TTL_SECONDS;

/// Placeholder secret used outside production when `JWT_SECRET` is unset
const DEV_JWT_SECRET: &str = "default-secret-change-in-production";

/// Longest accepted credential lifetime
const MAX_CREDENTIAL_TTL_DAYS: i64 = 365;

/// Longest accepted challenge lifetime
const MAX_CHALLENGE_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Secret for credential signing
    pub jwt_secret: String,

    /// Credential lifetime (default: 7 days)
    pub jwt_ttl: Duration,

    /// Challenge lifetime (default: 300 seconds)
    pub challenge_ttl: Duration,

    /// Interval between expired-challenge sweeps (default: 60 seconds)
    pub challenge_sweep_interval: StdDuration,

    /// Ethereum JSON-RPC endpoint for ENS lookups
    pub eth_rpc_url: String,

    /// Whether to resolve ENS profiles at all
    pub ens_enabled: bool,

    /// Upper bound on a single profile lookup
    pub ens_timeout: StdDuration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let jwt_ttl = parse_credential_ttl(
            &env::var("JWT_EXPIRES_IN").unwrap_or_else(|_| "7d".to_string()),
        )?;

        let challenge_ttl = match env::var("CHALLENGE_TTL_SECONDS") {
            Ok(value) => parse_challenge_ttl(&value)?,
            Err(_) => Duration::seconds(DEFAULT_CHALLENGE_TTL_SECONDS),
        };

        let challenge_sweep_interval = StdDuration::from_secs(
            env::var("CHALLENGE_SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .unwrap_or(60)
                .max(1),
        );

        let eth_rpc_url =
            env::var("ETH_RPC_URL").unwrap_or_else(|_| "https://eth.llamarpc.com".to_string());

        let ens_enabled = env::var("ENS_ENABLED")
            .map(|s| !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        let ens_timeout = StdDuration::from_millis(
            env::var("ENS_TIMEOUT_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u64>()
                .unwrap_or(3000),
        );

        Ok(Config {
            environment,
            port,
            log_level,
            cors_allowed_origins,
            jwt_secret,
            jwt_ttl,
            challenge_ttl,
            challenge_sweep_interval,
            eth_rpc_url,
            ens_enabled,
            ens_timeout,
        })
    }

    /// Whether the signing secret is the built-in development placeholder
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Parse a lifetime such as `900`, `15m`, `12h` or `7d`
///
/// A bare number is seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let invalid = || ConfigError::InvalidValue(format!("Invalid duration: '{}'", value));

    let (digits, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        Some(_) => (value, None),
        None => return Err(invalid()),
    };

    let amount = digits.parse::<i64>().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let duration = match unit {
        None | Some('s') => Duration::try_seconds(amount),
        Some('m') => Duration::try_minutes(amount),
        Some('h') => Duration::try_hours(amount),
        Some('d') => Duration::try_days(amount),
        Some(_) => None,
    };

    duration.ok_or_else(invalid)
}

/// Parse `JWT_EXPIRES_IN`, capped at `MAX_CREDENTIAL_TTL_DAYS`
pub fn parse_credential_ttl(value: &str) -> Result<Duration, ConfigError> {
    let ttl = parse_duration(value)?;

    if ttl > Duration::days(MAX_CREDENTIAL_TTL_DAYS) {
        return Err(ConfigError::InvalidValue(format!(
            "JWT_EXPIRES_IN must not exceed {} days",
            MAX_CREDENTIAL_TTL_DAYS
        )));
    }

    Ok(ttl)
}

/// Parse `CHALLENGE_TTL_SECONDS`: whole seconds, at most one day
pub fn parse_challenge_ttl(value: &str) -> Result<Duration, ConfigError> {
    let seconds = value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| (1..=MAX_CHALLENGE_TTL_SECONDS).contains(secs))
        .ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "CHALLENGE_TTL_SECONDS must be between 1 and {}, got '{}'",
                MAX_CHALLENGE_TTL_SECONDS, value
            ))
        })?;

    Ok(Duration::seconds(seconds))
}
