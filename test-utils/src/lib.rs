//! Ministry API Test Utils
//!
//! Provides shared testing utilities for building unit and router tests for the ministry
//! API. This crate offers a builder pattern for creating test contexts backed by in-memory
//! SQLite pools with configurable tuning, plus helpers for issuing requests against an
//! axum `Router` and reading their JSON bodies.
//!
//! # Overview
//!
//! - **TestBuilder**: Fluent builder for configuring the test pool
//! - **TestContext**: Test environment holding the database connection
//! - **TestError**: Error types that can occur during test setup
//! - **request** / **response**: Request constructors and body readers
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use test_utils::builder::TestBuilder;
//!
//! #[tokio::test]
//! async fn test_pool_exhaustion() -> Result<(), TestError> {
//!     let test = TestBuilder::new()
//!         .with_max_connections(1)
//!         .with_acquire_timeout(Duration::from_millis(100))
//!         .build()
//!         .await?;
//!
//!     let db = test.db.unwrap();
//!     // Borrow connections...
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod request;
pub mod response;
