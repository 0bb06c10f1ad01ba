//! Process configuration, read from the environment (and `.env`, loaded by `main`).

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Store connection string. Absent means the service runs without a store.
    pub database_url: Option<String>,
    /// Overrides the database named in `database_url`.
    pub database_name: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    /// Serve from the in-process store instead of Postgres.
    pub memory_store: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            database_name: non_empty("DATABASE_NAME"),
            host: parse_or(non_empty("HOST"), "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(non_empty("PORT"), "PORT", DEFAULT_PORT)?,
            max_connections: parse_or(
                non_empty("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                num_cpus::get() as u32 * 2,
            )?,
            memory_store: matches!(
                non_empty("MEMORY_STORE").as_deref(),
                Some("1" | "true" | "TRUE" | "yes" | "YES")
            ),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
