//! Runtime configuration, read from `BANKING_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::schema::SchemaVariant;
use crate::validator::ValidationPolicy;

#[derive(Debug, Error)]
#[error("invalid value '{value}' for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file; `:memory:` opens a private in-memory database
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub schema_variant: SchemaVariant,

    /// Treat only absent/null/blank values as missing (zero becomes valid)
    pub strict_validation: bool,

    /// Answer an empty list with 200 `[]` instead of 404
    pub empty_list_ok: bool,

    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("banking.db")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            schema_variant: SchemaVariant::default(),
            strict_validation: false,
            empty_list_ok: false,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or blank variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name).and_then(|v| {
                let trimmed = v.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let mut config = Config::default();

        if let Some(path) = var("BANKING_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(host) = var("BANKING_HOST") {
            config.host = host;
        }
        if let Some(port) = var("BANKING_PORT") {
            config.port = port.parse().map_err(|e: std::num::ParseIntError| ConfigError {
                var: "BANKING_PORT",
                value: port.clone(),
                reason: e.to_string(),
            })?;
        }
        if let Some(variant) = var("BANKING_SCHEMA_VARIANT") {
            config.schema_variant = variant.parse().map_err(|reason| ConfigError {
                var: "BANKING_SCHEMA_VARIANT",
                value: variant.clone(),
                reason,
            })?;
        }
        if let Some(flag) = var("BANKING_STRICT_VALIDATION") {
            config.strict_validation = parse_bool("BANKING_STRICT_VALIDATION", &flag)?;
        }
        if let Some(flag) = var("BANKING_EMPTY_LIST_OK") {
            config.empty_list_ok = parse_bool("BANKING_EMPTY_LIST_OK", &flag)?;
        }
        if let Some(ms) = var("BANKING_BUSY_TIMEOUT_MS") {
            config.busy_timeout_ms = ms.parse().map_err(|e: std::num::ParseIntError| ConfigError {
                var: "BANKING_BUSY_TIMEOUT_MS",
                value: ms.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        if self.strict_validation {
            ValidationPolicy::Strict
        } else {
            ValidationPolicy::Compat
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
