use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::error::TestError;

/// Test context containing the database connection for a single test.
///
/// Provides an in-memory SQLite pool for isolated unit and router testing. The pool
/// persists for the lifetime of the test context.
pub struct TestContext {
    /// Optional database connection to the in-memory SQLite instance.
    ///
    /// Set by `TestBuilder::build()`.
    pub db: Option<DatabaseConnection>,
}

impl TestContext {
    /// Creates a new empty test context.
    ///
    /// # Returns
    /// - New `TestContext` instance with no database connection
    pub fn new() -> Self {
        Self { db: None }
    }

    /// Opens the pool with the given options, replacing any existing connection.
    ///
    /// Typically called internally by `TestBuilder::build()` rather than directly.
    ///
    /// # Returns
    /// - `Ok(&DatabaseConnection)` - Reference to the new connection
    /// - `Err(TestError::Database)` - Failed to connect
    pub async fn connect(&mut self, opt: ConnectOptions) -> Result<&DatabaseConnection, TestError> {
        let db = Database::connect(opt).await?;

        let db_ref = self.db.insert(db);

        Ok(&*db_ref) // Re-borrow as immutable
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
