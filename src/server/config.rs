use std::{fmt, net::SocketAddr};

use axum::http::HeaderValue;

use crate::server::error::{config::ConfigError, AppError};

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Runtime mode selected by `APP_ENV`.
///
/// Development switches logging to the verbose format and enables SQL statement
/// logging; every other value falls back to production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Reads `APP_ENV` directly, for use before the full configuration is loaded.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("APP_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("development") => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Config {
    pub database_url: String,
    pub environment: Environment,

    pub frontend_url: HeaderValue,
    pub bind_addr: SocketAddr,

    /// Whether a failed supervised background task shuts the process down.
    pub shutdown_on_task_failure: bool,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// Must run before the database pool is built and before any listener binds. A
    /// missing `DATABASE_URL` is fatal; the string itself is not validated beyond being
    /// non-blank, malformed values surface later as connection errors.
    ///
    /// # Returns
    /// - `Ok(Config)` - All required variables present and optional ones parseable
    /// - `Err(AppError::ConfigErr(_))` - Missing or invalid variable
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests pass a map instead of touching the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let environment = Environment::parse(lookup("APP_ENV").as_deref());

        let frontend_url = lookup("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());
        let frontend_url =
            HeaderValue::from_str(&frontend_url).map_err(|e| ConfigError::InvalidEnvVar {
                name: "FRONTEND_URL".to_string(),
                reason: e.to_string(),
            })?;

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(port) => port.trim().parse::<u16>().map_err(|e| ConfigError::InvalidEnvVar {
                name: "PORT".to_string(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                name: "HOST".to_string(),
                reason: e.to_string(),
            })?;

        let shutdown_on_task_failure = match lookup("SHUTDOWN_ON_TASK_FAILURE") {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidEnvVar {
                name: "SHUTDOWN_ON_TASK_FAILURE".to_string(),
                reason: format!("expected a boolean, got '{}'", value),
            })?,
            None => true,
        };

        Ok(Self {
            database_url,
            environment,
            frontend_url,
            bind_addr,
            shutdown_on_task_failure,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
