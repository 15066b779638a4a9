// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted interval or timeout, in seconds (one year).
const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;
/// Accepted range for `NOTIFICATION_RETENTION_DAYS`.
pub const RETENTION_DAYS: RangeInclusive<i64> = 1..=3650;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Browser origin allowed by CORS in addition to localhost
    pub frontend_url: Option<String>,

    // --- Delivery scheduler ---
    /// How often the pending notification queue is drained
    pub queue_interval: Duration,
    /// How often old and expired notifications are purged
    pub cleanup_interval: Duration,
    /// Upper bound on a single channel adapter call
    pub channel_timeout: Duration,
    /// Notifications delivered in parallel within one drain
    pub max_concurrent_deliveries: usize,
    /// Notifications older than this are purged regardless of status
    pub notification_retention_days: i64,

    // --- Presence ---
    /// Trailing window for the "online" heuristic
    pub presence_window: Duration,

    // --- Channel adapters (optional) ---
    pub push_gateway_url: Option<String>,
    pub email_relay_url: Option<String>,
    /// HMAC key for signing outbound adapter requests
    pub outbound_signing_key: Option<Vec<u8>>,
}

impl Config {
    /// Config for tests: short timeouts, no outbound adapters.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            frontend_url: None,
            queue_interval: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(24 * 60 * 60),
            channel_timeout: Duration::from_millis(200),
            max_concurrent_deliveries: 8,
            notification_retention_days: 30,
            presence_window: Duration::from_secs(5 * 60),
            push_gateway_url: None,
            email_relay_url: None,
            outbound_signing_key: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            frontend_url: optional("FRONTEND_URL"),
            queue_interval: period_secs("QUEUE_INTERVAL_SECS", 30)?,
            cleanup_interval: period_secs("CLEANUP_INTERVAL_SECS", 86_400)?,
            channel_timeout: period_secs("CHANNEL_TIMEOUT_SECS", 10)?,
            max_concurrent_deliveries: parse_in("MAX_CONCURRENT_DELIVERIES", 32, 1..=usize::MAX)?,
            notification_retention_days: parse_in(
                "NOTIFICATION_RETENTION_DAYS",
                30,
                RETENTION_DAYS,
            )?,
            presence_window: period_secs("PRESENCE_WINDOW_SECS", 300)?,
            push_gateway_url: optional("PUSH_GATEWAY_URL"),
            email_relay_url: optional("EMAIL_RELAY_URL"),
            outbound_signing_key: optional("OUTBOUND_SIGNING_KEY").map(String::into_bytes),
        })
    }
}

/// Read a non-empty, trimmed variable.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(default),
    }
}

/// Parse a variable that must fall inside `range`.
fn parse_in<T>(key: &'static str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Display,
{
    let value = parse_or(key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(key, value.to_string()))
    }
}

/// A non-zero period given in whole seconds.
fn period_secs(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parse_in(key, default, 1..=MAX_PERIOD_SECS).map(Duration::from_secs)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
