use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::LimiterSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_max_lifetime_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub rate_limit_sweep_secs: u64,
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env 不存在时直接使用进程环境变量
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源构建配置，测试中用闭包代替进程环境
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", 5)?,
            db_max_lifetime_secs: parse_or(&lookup, "DB_MAX_LIFETIME_SECS", 60)?,
            rate_limit_window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW", 60)?,
            rate_limit_requests: parse_or(&lookup, "RATE_LIMIT_REQUESTS", 10)?,
            rate_limit_sweep_secs: parse_or(&lookup, "RATE_LIMIT_SWEEP_INTERVAL", 300)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?,
            shutdown_grace_secs: parse_or(&lookup, "SHUTDOWN_GRACE_SECS", 5)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        };

        // 限流参数为 0 没有意义
        reject_zero("RATE_LIMIT_WINDOW", config.rate_limit_window_secs)?;
        reject_zero("RATE_LIMIT_REQUESTS", u64::from(config.rate_limit_requests))?;
        reject_zero("RATE_LIMIT_SWEEP_INTERVAL", config.rate_limit_sweep_secs)?;
        if !(4..=31).contains(&config.bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: config.bcrypt_cost.to_string(),
            });
        }

        Ok(config)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn db_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.db_max_lifetime_secs)
    }

    pub fn limiter_settings(&self) -> LimiterSettings {
        LimiterSettings {
            window: self.rate_limit_window(),
            max_requests: self.rate_limit_requests,
            sweep_interval: self.sweep_interval(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn reject_zero(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(())
}
