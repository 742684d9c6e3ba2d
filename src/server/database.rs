//! Database connection pool construction.
//!
//! The pool is built exactly once, in `main`, after configuration has been validated.
//! Handlers never reach for a global; they receive a clone of the `DatabaseConnection`
//! through `AppState`, and every clone shares the same underlying pool.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use url::Url;

use crate::server::{
    config::Config,
    error::{config::ConfigError, AppError},
};

/// Tuning applied to the shared connection pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    /// Hard cap on concurrently borrowed connections.
    pub max_connections: u32,
    /// Idle pooled connections are recycled after this long.
    pub idle_timeout: Duration,
    /// Borrowers waiting longer than this fail with an acquisition timeout.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            idle_timeout: Duration::from_millis(30_000),
            acquire_timeout: Duration::from_millis(10_000),
        }
    }
}

impl PoolSettings {
    /// Builds SeaORM connect options for the given URL.
    ///
    /// The connect timeout for new physical connections equals the acquisition timeout,
    /// so a slow database can't stretch a borrow past its deadline.
    pub fn connect_options(&self, url: String, sql_logging: bool) -> ConnectOptions {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(self.max_connections)
            .idle_timeout(self.idle_timeout)
            .acquire_timeout(self.acquire_timeout)
            .connect_timeout(self.acquire_timeout)
            .sqlx_logging(sql_logging);
        opt
    }
}

/// Normalizes the configured connection string.
///
/// Postgres URLs get `sslmode=require` unless they already choose a mode: the session is
/// encrypted but the server certificate is not verified, which hosted databases with
/// private CAs need. Any other scheme is returned untouched.
///
/// # Returns
/// - `Ok(String)` - URL ready to hand to the driver
/// - `Err(ConfigError::InvalidEnvVar)` - Postgres-looking string that isn't a URL
pub fn connection_url(raw: &str) -> Result<String, ConfigError> {
    let is_postgres = raw.starts_with("postgres://") || raw.starts_with("postgresql://");
    if !is_postgres {
        return Ok(raw.to_string());
    }

    let mut url = Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar {
        name: "DATABASE_URL".to_string(),
        reason: e.to_string(),
    })?;

    let has_ssl_mode = url.query_pairs().any(|(key, _)| key == "sslmode");
    if !has_ssl_mode {
        url.query_pairs_mut().append_pair("sslmode", "require");
    }

    Ok(url.into())
}

/// Connects the shared pool using the default tuning.
///
/// # Arguments
/// - `config` - Validated application configuration
///
/// # Returns
/// - `Ok(DatabaseConnection)` - Open pool
/// - `Err(AppError)` - Invalid URL or the database refused the first connection
pub async fn connect(config: &Config) -> Result<DatabaseConnection, AppError> {
    connect_with(config, &PoolSettings::default()).await
}

pub async fn connect_with(
    config: &Config,
    settings: &PoolSettings,
) -> Result<DatabaseConnection, AppError> {
    let url = connection_url(&config.database_url)?;
    let opt = settings.connect_options(url, config.environment.is_development());

    let db = Database::connect(opt).await?;

    tracing::info!(
        max_connections = settings.max_connections,
        idle_timeout_ms = settings.idle_timeout.as_millis() as u64,
        acquire_timeout_ms = settings.acquire_timeout.as_millis() as u64,
        "Database pool open"
    );

    Ok(db)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use sea_orm::{ConnAcquireErr, ConnectionTrait, DbErr, TransactionTrait};
    use test_utils::builder::TestBuilder;

    use super::*;

    #[test]
    fn default_settings_match_production_tuning() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_connections, 10);
        assert_eq!(settings.idle_timeout, Duration::from_secs(30));
        assert_eq!(settings.acquire_timeout, Duration::from_secs(10));

        let opt = settings.connect_options("postgres://db/church".to_string(), false);
        assert_eq!(opt.get_max_connections(), Some(10));
        assert_eq!(opt.get_acquire_timeout(), Some(Duration::from_secs(10)));
    }

    /// Tests that TLS is requested for postgres URLs without an explicit mode.
    ///
    /// Expected: `sslmode=require` appended, existing query kept
    #[test]
    fn appends_ssl_mode_to_postgres_url() {
        let url = connection_url("postgres://user:pw@db.example.com:5432/church").unwrap();
        assert_eq!(
            url,
            "postgres://user:pw@db.example.com:5432/church?sslmode=require"
        );

        let url =
            connection_url("postgresql://user:pw@db.example.com/church?application_name=api")
                .unwrap();
        assert!(url.ends_with("?application_name=api&sslmode=require"));
    }

    #[test]
    fn keeps_explicit_ssl_mode() {
        let raw = "postgres://user:pw@localhost/church?sslmode=disable";
        assert_eq!(connection_url(raw).unwrap(), raw);
    }

    #[test]
    fn passes_other_schemes_through() {
        assert_eq!(connection_url("sqlite::memory:").unwrap(), "sqlite::memory:");
    }

    #[test]
    fn rejects_unparseable_postgres_url() {
        let result = connection_url("postgres://user:pw@[bad-host/church");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }

    /// Tests that borrowers beyond the pool cap fail instead of hanging.
    ///
    /// Holds the only connection of a single-connection pool in an open transaction,
    /// then issues another query on the same pool.
    ///
    /// Expected: Err(DbErr::ConnectionAcquire(Timeout)) close to the acquire timeout
    #[tokio::test]
    async fn excess_borrower_times_out() -> Result<(), DbErr> {
        let test = TestBuilder::new()
            .with_max_connections(1)
            .with_acquire_timeout(Duration::from_millis(200))
            .build()
            .await
            .unwrap();
        let db = test.db.as_ref().unwrap();

        let held = db.begin().await?;

        let started = Instant::now();
        let result = db.execute_unprepared("SELECT 1").await;
        let elapsed = started.elapsed();

        assert!(matches!(
            result,
            Err(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout))
        ));
        assert!(elapsed >= Duration::from_millis(150));
        assert!(elapsed < Duration::from_secs(5));

        held.rollback().await?;

        // Connection is back in the pool
        db.execute_unprepared("SELECT 1").await?;

        Ok(())
    }
}
