use chrono::Duration;
use std::env;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Token lifetimes from one hour up to ten years.
const JWT_EXPIRE_HOURS_RANGE: RangeInclusive<i64> = 1..=87_600;
const BCRYPT_COST_RANGE: RangeInclusive<u32> = 4..=31;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Token settings handed to `TokenService::new`.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub lifetime: Duration,
}

pub struct Config {
    /// Postgres connection string. Without one the server keeps data in memory.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expire_hours: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            server_port: parse_var("SERVER_PORT", 8080, "a port number")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty())
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "todolist".to_string()),
            jwt_expire_hours: parse_ranged(
                "JWT_EXPIRE_HOURS",
                24,
                JWT_EXPIRE_HOURS_RANGE,
                "a whole number of hours between 1 and 87600",
            )?,
            bcrypt_cost: parse_ranged(
                "BCRYPT_COST",
                bcrypt::DEFAULT_COST,
                BCRYPT_COST_RANGE,
                "a bcrypt cost between 4 and 31",
            )?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }

    pub fn jwt(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            lifetime: Duration::hours(self.jwt_expire_hours),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}

fn parse_ranged<T>(
    name: &'static str,
    default: T,
    range: RangeInclusive<T>,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + ToString,
{
    let value = parse_var(name, default, expected)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            expected,
            value: value.to_string(),
        })
    }
}
