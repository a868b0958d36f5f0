//! Configuration management for the Wayfarer server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! `.env` files are honored in development via `dotenvy` (loaded by `main`).

use crate::types::{Identity, Role, UserId};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

/// Errors produced while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value
    #[error("invalid value for {name}: {message}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// What was wrong with it
        message: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Lifecycle engine configuration
    pub engine: EngineConfig,
    /// API token table for the static identity provider
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level filter (trace, debug, info, warn, error, or any env-filter)
    pub log_level: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Lifecycle engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a request waits for an engine reply, in seconds
    pub reply_timeout: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Seeded API tokens
    pub tokens: Vec<TokenEntry>,
}

/// One `token → identity` entry for the static identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    /// The bearer token
    pub token: String,
    /// The user the token authenticates
    pub user_id: Uuid,
    /// The user's role
    pub role: Role,
}

impl TokenEntry {
    /// The identity this entry resolves to
    #[must_use]
    pub const fn identity(&self) -> Identity {
        Identity::new(UserId::from_uuid(self.user_id), self.role)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `WAYFARER_HOST` | `0.0.0.0` |
    /// | `WAYFARER_PORT` | `8080` |
    /// | `WAYFARER_LOG_LEVEL` | `info` |
    /// | `WAYFARER_SHUTDOWN_TIMEOUT` | `30` |
    /// | `WAYFARER_ENGINE_TIMEOUT` | `10` |
    /// | `WAYFARER_API_TOKENS` | empty |
    ///
    /// `WAYFARER_API_TOKENS` is a comma-separated list of
    /// `token:user_uuid:role` triples, e.g.
    /// `t1:550e8400-e29b-41d4-a716-446655440000:traveler,a1:…:admin`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable holds an
    /// unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig {
                host: env_or("WAYFARER_HOST", "0.0.0.0"),
                port: parse_env("WAYFARER_PORT", 8080)?,
                log_level: env_or("WAYFARER_LOG_LEVEL", "info"),
                shutdown_timeout: parse_env("WAYFARER_SHUTDOWN_TIMEOUT", 30)?,
            },
            engine: EngineConfig {
                reply_timeout: parse_env("WAYFARER_ENGINE_TIMEOUT", 10)?,
            },
            auth: AuthConfig {
                tokens: parse_tokens(&env_or("WAYFARER_API_TOKENS", ""))?,
            },
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated list of `token:user_uuid:role` triples
fn parse_tokens(raw: &str) -> Result<Vec<TokenEntry>, ConfigError> {
    let mut entries = Vec::new();
    for triple in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let mut parts = triple.splitn(3, ':');
        let (Some(token), Some(user), Some(role)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ConfigError::Invalid {
                name: "WAYFARER_API_TOKENS",
                message: format!("expected token:user_uuid:role, got {triple:?}"),
            });
        };
        let user_id = Uuid::parse_str(user).map_err(|e| ConfigError::Invalid {
            name: "WAYFARER_API_TOKENS",
            message: format!("bad user uuid in {triple:?}: {e}"),
        })?;
        let role: Role = role.parse().map_err(|e| ConfigError::Invalid {
            name: "WAYFARER_API_TOKENS",
            message: e,
        })?;
        entries.push(TokenEntry {
            token: token.to_string(),
            user_id,
            role,
        });
    }
    Ok(entries)
}
