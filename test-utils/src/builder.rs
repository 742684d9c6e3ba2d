use std::time::Duration;

use sea_orm::ConnectOptions;

use crate::{context::TestContext, error::TestError};

/// In-memory SQLite: every physical connection is its own database, so tests default
/// to a single pooled connection.
const MEMORY_URL: &str = "sqlite::memory:";

/// Builder for creating test contexts with a customizable pool.
///
/// Provides a fluent interface for configuring the pool behind a test. Call `build()`
/// to open the pool and get the configured test context.
///
/// # Example
///
/// ```rust,ignore
/// use test_utils::builder::TestBuilder;
///
/// let test = TestBuilder::new()
///     .with_acquire_timeout(Duration::from_millis(200))
///     .build()
///     .await?;
/// ```
pub struct TestBuilder {
    /// Cap on concurrently borrowed connections.
    max_connections: u32,

    /// How long a borrower waits before failing with an acquisition timeout.
    ///
    /// `None` keeps the driver default.
    acquire_timeout: Option<Duration>,
}

impl TestBuilder {
    /// Creates a new test builder with a single-connection pool.
    ///
    /// # Returns
    /// - New `TestBuilder` instance with default pool tuning
    pub fn new() -> Self {
        Self {
            max_connections: 1,
            acquire_timeout: None,
        }
    }

    /// Sets the pool's connection cap.
    ///
    /// # Arguments
    /// - `max_connections` - Maximum number of concurrently borrowed connections
    ///
    /// # Returns
    /// - `Self` - Builder instance for method chaining
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Sets how long borrowers wait for a free connection.
    ///
    /// Keep this short in tests that exhaust the pool on purpose.
    ///
    /// # Arguments
    /// - `timeout` - Acquisition timeout
    ///
    /// # Returns
    /// - `Self` - Builder instance for method chaining
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Builds and initializes the test context.
    ///
    /// Opens the in-memory SQLite pool with the configured tuning.
    ///
    /// # Returns
    /// - `Ok(TestContext)` - Test context with an open pool
    /// - `Err(TestError::Database)` - Failed to open the pool
    pub async fn build(self) -> Result<TestContext, TestError> {
        let mut opt = ConnectOptions::new(MEMORY_URL);
        opt.max_connections(self.max_connections)
            .min_connections(0)
            .sqlx_logging(false);
        if let Some(timeout) = self.acquire_timeout {
            opt.acquire_timeout(timeout);
        }

        let mut setup = TestContext::new();

        setup.connect(opt).await?;

        Ok(setup)
    }
}

impl Default for TestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
