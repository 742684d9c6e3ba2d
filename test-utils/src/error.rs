use thiserror::Error;

/// Errors that can occur while setting up a test context.
#[derive(Error, Debug)]
pub enum TestError {
    /// Failed to open the in-memory SQLite pool.
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}
