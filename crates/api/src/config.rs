use anyhow::Context;
use savings_core::account::PostingConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Financial year start and posting date convention for interest.
    pub posting: PostingConfig,
    /// Period of the interest posting and maturity jobs (default: `3600`).
    pub job_interval_secs: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`                    |
    /// | `FINANCIAL_YEAR_BEGINNING_MONTH` | `1`                     |
    /// | `INTEREST_POSTING_AT_PERIOD_END` | `true`                  |
    /// | `JOB_INTERVAL_SECS`              | `3600`                  |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000)?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30)?;
        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", 30)?;

        let financial_year_beginning_month: u32 = env_or("FINANCIAL_YEAR_BEGINNING_MONTH", 1)?;
        anyhow::ensure!(
            (1..=12).contains(&financial_year_beginning_month),
            "FINANCIAL_YEAR_BEGINNING_MONTH must be between 1 and 12"
        );
        let post_at_period_end: bool = env_or("INTEREST_POSTING_AT_PERIOD_END", true)?;

        let job_interval_secs: u64 = env_or("JOB_INTERVAL_SECS", 3600)?;
        anyhow::ensure!(job_interval_secs > 0, "JOB_INTERVAL_SECS must be positive");

        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            posting: PostingConfig {
                financial_year_beginning_month,
                post_at_period_end,
            },
            job_interval_secs,
        })
    }
}
