//! Configuration module for tenant-reset.
//!
//! Everything is read once at startup and is immutable for the run.

use crate::models::KeepList;
use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResetConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub orgs_to_keep: KeepList,
    pub users_to_keep: KeepList,
    pub polling: PollingConfig,
    /// Upper bound on organization reconciliation rounds; `None` runs until converged.
    pub max_rounds: Option<u32>,
    pub reset_password: Secret<String>,
    pub progress_bar: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Secret<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(self.password.expose_secret())
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub username: String,
    pub api_key: Secret<String>,
    pub timeout: Duration,
    /// Retries for idempotent reads; deletes are never retried by the client.
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub interval: Duration,
    /// `None` polls until the job completes, however long that takes.
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

impl ResetConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&lookup, "DB_PORT", 5432)?,
            name: required(&lookup, "DB_NAME")?,
            user: required(&lookup, "DB_USER")?,
            password: Secret::new(lookup("DB_PASSWORD").unwrap_or_default()),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 1)?,
        };

        let api = ApiConfig {
            base_url: required(&lookup, "API_URL")?
                .trim_end_matches('/')
                .to_string(),
            username: lookup("API_USERNAME").unwrap_or_default(),
            api_key: Secret::new(lookup("API_KEY").unwrap_or_default()),
            timeout: Duration::from_secs(parse_or(&lookup, "API_TIMEOUT_SECS", 30)?),
            max_retries: parse_or(&lookup, "API_MAX_RETRIES", 3)?,
        };

        let polling = PollingConfig {
            interval: Duration::from_millis(parse_or(&lookup, "JOB_POLL_INTERVAL_MS", 1000)?),
            max_attempts: parse_optional(&lookup, "JOB_POLL_MAX_ATTEMPTS")?,
        };

        Ok(Self {
            common,
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "tenant-reset".to_string()),
            database,
            api,
            orgs_to_keep: keep_list(&lookup, "ORGS_TO_KEEP")?,
            users_to_keep: keep_list(&lookup, "USERS_TO_KEEP")?,
            polling,
            max_rounds: parse_optional(&lookup, "RECONCILE_MAX_ROUNDS")?,
            reset_password: Secret::new(
                lookup("RESET_PASSWORD").unwrap_or_else(|| "password".to_string()),
            ),
            progress_bar: parse_or(&lookup, "PROGRESS_BAR", true)?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("{} is required", key)))
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|value| !value.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has invalid value {:?}: {}", key, raw, e))
        }),
        None => Ok(None),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn keep_list<F>(lookup: &F, key: &str) -> Result<KeepList, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| "[]".to_string());
    KeepList::from_json(&raw).map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "{} must be a JSON array of integer ids: {}",
            key,
            e
        ))
    })
}
