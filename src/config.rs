use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;

use crate::core::jwt::DEFAULT_SECRET_KEY;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_form_size")]
    pub max_form_size: bytesize::ByteSize,
    pub database_url: String,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub admin: Option<AdminAccount>,
}

/// Connection pool limits handed to sea-orm's `ConnectOptions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub sqlx_logging: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 5,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            sqlx_logging: false,
        }
    }
}

impl PoolConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub secret: String,
    pub cookie_name: String,
    pub idle_timeout_minutes: i64,
    pub token_ttl_hours: i64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET_KEY.to_string(),
            cookie_name: "soundhall_session".to_string(),
            idle_timeout_minutes: 30,
            token_ttl_hours: 24,
            sweep_interval_secs: 60,
        }
    }
}

/// Account ensured at startup so a fresh database has someone who can moderate.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

fn default_max_form_size() -> bytesize::ByteSize {
    bytesize::ByteSize::mib(1)
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_password_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl Config {
    pub fn load(config_file: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::from(config_file.into()).required(false))
            .add_source(Environment::with_prefix("SOUNDHALL").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}
