use ethereal_core::config as core_config;
use ethereal_core::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct EtherealConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub token: TokenConfig,
    pub room: RoomConfig,
    pub pin: PinConfig,
    pub rate_limit: RateLimitConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Symmetric signing key for session tokens. Never logged.
    pub secret: String,
    pub session_ttl_days: i64,
    pub diary_token_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomConfig {
    pub capacity: i64,
    pub secret_min_length: usize,
    pub lock_lease_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinConfig {
    /// Lower-privilege diary unlock PIN, compared in constant time.
    pub diary_pin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_failures: i64,
    pub block_seconds: i64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: String,
}

impl EtherealConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = EtherealConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("ethereal-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", Some("sqlite://ethereal.db?mode=rwc"), is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "5", is_prod)?,
            },
            token: TokenConfig {
                secret: get_env("TOKEN_SECRET", Some("dev-only-signing-secret"), is_prod)?,
                session_ttl_days: parse_env("SESSION_TTL_DAYS", "7", is_prod)?,
                diary_token_ttl_minutes: parse_env("DIARY_TOKEN_TTL_MINUTES", "60", is_prod)?,
            },
            room: RoomConfig {
                capacity: parse_env("ROOM_CAPACITY", "10", is_prod)?,
                secret_min_length: parse_env("ROOM_SECRET_MIN_LENGTH", "4", is_prod)?,
                lock_lease_seconds: parse_env("LOCK_LEASE_SECONDS", "120", is_prod)?,
            },
            pin: PinConfig {
                diary_pin: get_env("DIARY_PIN", Some("0000"), is_prod)?,
            },
            rate_limit: RateLimitConfig {
                max_failures: parse_env("RATE_LIMIT_MAX_FAILURES", "5", is_prod)?,
                block_seconds: parse_env("RATE_LIMIT_BLOCK_SECONDS", "900", is_prod)?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", "300", is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    is_prod,
                )?,
            },
            media: MediaConfig {
                root: get_env("MEDIA_ROOT", Some("./media"), is_prod)?,
            },
        };

        Ok(config)
    }
}

/// Read an environment variable, falling back to `default` outside prod.
///
/// In prod a variable without a value is a startup failure; silently running
/// with a dev default (above all `TOKEN_SECRET`) is worse than not starting.
fn get_env(name: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    if let Ok(value) = env::var(name) {
        if !value.is_empty() {
            return Ok(value);
        }
    }

    match default {
        Some(d) if !is_prod || allowed_in_prod(name) => Ok(d.to_string()),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "missing required environment variable {}",
            name
        ))),
    }
}

/// Defaults that stay acceptable in prod (tunables, not secrets).
fn allowed_in_prod(name: &str) -> bool {
    !matches!(name, "TOKEN_SECRET" | "DIARY_PIN" | "DATABASE_URL")
}

fn parse_env<T>(name: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(name, Some(default), is_prod)?
        .parse()
        .map_err(|e: T::Err| {
            AppError::ConfigError(anyhow::anyhow!("invalid value for {}: {}", name, e))
        })
}
