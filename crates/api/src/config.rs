//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Requests allowed per client IP per hour when not configured.
pub const DEFAULT_RATE_LIMIT_PER_HOUR: u32 = 1000;

/// Tracing filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Deployment environment, selected by `ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Test,
    Local,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            "local" => Ok(Environment::Local),
            other => Err(format!("expected production, test or local, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub addr: String,
    pub password: Option<String>,
    pub db: u32,
    pub cart_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub s3_bucket: String,
    pub s3_endpoint: Option<String>,
    pub ses_endpoint: Option<String>,
    pub ses_source_email: String,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_key: String,
    /// Enables webhook signature checks when present.
    pub webhook_secret: Option<String>,
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `ENV`: `production`, `test` or `local`; `local` loads `.env` first
/// - `SERVER_ADDR`, `SERVER_TIMEOUT` (seconds)
/// - `DATABASE_URI`, `MIGRATION_SOURCE`
/// - `REDIS_ADDR`, `REDIS_PASSWORD` (optional), `REDIS_DB`, `REDIS_CART_TTL` (minutes)
/// - `AWS_REGION`, `AWS_S3_BUCKET`, `AWS_S3_ENDPOINT` (optional),
///   `AWS_SES_ENDPOINT` (optional), `AWS_SES_SOURCE_EMAIL`
/// - `JWT_SECRET`
/// - `STRIPE_API_KEY`, `STRIPE_WEBHOOK_SECRET` (optional)
/// - `RATE_LIMIT_PER_HOUR` (default 1000), `RUST_LOG` (default `info`)
#[derive(Debug, Clone)]
pub struct Config {
    pub env: Environment,
    pub server_addr: String,
    pub server_timeout: Duration,
    pub database_uri: String,
    pub migration_source: String,
    pub redis: RedisConfig,
    pub aws: AwsConfig,
    pub jwt_secret: String,
    pub stripe: StripeConfig,
    pub rate_limit_per_hour: u32,
    pub log_filter: String,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if std::env::var("ENV").as_deref() == Ok("local") {
            // A missing .env file is fine; the variables may already be set.
            let _ = dotenvy::dotenv();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the raw value of
    /// a variable or `None` when it is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        Ok(Self {
            env: vars.parse("ENV")?,
            server_addr: vars.required("SERVER_ADDR")?,
            server_timeout: Duration::from_secs(vars.parse("SERVER_TIMEOUT")?),
            database_uri: vars.required("DATABASE_URI")?,
            migration_source: vars.required("MIGRATION_SOURCE")?,
            redis: RedisConfig {
                addr: vars.required("REDIS_ADDR")?,
                password: vars.optional("REDIS_PASSWORD"),
                db: vars.parse("REDIS_DB")?,
                cart_ttl: Duration::from_secs(vars.parse::<u64>("REDIS_CART_TTL")? * 60),
            },
            aws: AwsConfig {
                region: vars.required("AWS_REGION")?,
                s3_bucket: vars.required("AWS_S3_BUCKET")?,
                s3_endpoint: vars.optional("AWS_S3_ENDPOINT"),
                ses_endpoint: vars.optional("AWS_SES_ENDPOINT"),
                ses_source_email: vars.required("AWS_SES_SOURCE_EMAIL")?,
            },
            jwt_secret: vars.required("JWT_SECRET")?,
            stripe: StripeConfig {
                api_key: vars.required("STRIPE_API_KEY")?,
                webhook_secret: vars.optional("STRIPE_WEBHOOK_SECRET"),
            },
            rate_limit_per_hour: vars
                .parse_optional("RATE_LIMIT_PER_HOUR")?
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_HOUR),
            log_filter: vars
                .optional("RUST_LOG")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Returns the trimmed value, treating blank values as unset.
    fn optional(&self, name: &'static str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn parse<T>(&self, name: &'static str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.parse_optional(name)?.ok_or(ConfigError::Missing(name))
    }

    fn parse_optional<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(name)
            .map(|raw| {
                raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                })
            })
            .transpose()
    }
}
