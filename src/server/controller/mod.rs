//! HTTP request handlers.
//!
//! Business resource handlers (events, ministries, prayer requests and the rest) are
//! mounted by their own routers under `/api`; this module only holds the handlers
//! the service itself owns.

pub mod fallback;
pub mod health;
pub mod status;
