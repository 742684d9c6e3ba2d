//! Server-side HTTP backend and process lifecycle.
//!
//! The backend uses Axum as the web framework and SeaORM for database access. The
//! resource handlers (events, ministries, prayer requests, and so on) plug into the
//! `/api` router; this module owns everything around them.
//!
//! # Modules
//!
//! - **Configuration** (`config`) - Environment-based configuration, validated before anything else
//! - **Database** (`database`) - Construction of the single shared connection pool
//! - **Lifecycle** (`lifecycle/`) - Pool ownership and the one-shot drain on shutdown
//! - **Middleware** (`middleware/`) - Rate limiter client key, JSON error envelope for layer rejections
//! - **Router** (`router`) - Middleware stack, route mounting, 404 fallback
//! - **Controller** (`controller/`) - Health, status and fallback handlers
//! - **Error** (`error/`) - Application error types and JSON error envelopes
//! - **State** (`state`) - Shared application state (pool, runtime mode)
//! - **Startup** (`startup`) - Tracing setup and the serve-until-drained loop
//!
//! # Startup Order
//!
//! 1. **Config** is read from the environment; a missing `DATABASE_URL` aborts here
//! 2. **Pool** is opened once and handed to the lifecycle manager
//! 3. **Triggers** (signals, panic hook) are wired to the lifecycle manager
//! 4. **Listener** binds and serves until the first trigger drains the pool

pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod router;
pub mod startup;
pub mod state;
