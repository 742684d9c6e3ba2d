//! Request and response middleware shared by every route.
//!
//! - **client_ip** - Rate limiter key taken from the trusted proxy's hop
//! - **envelope** - Rewrites plain-text error responses from layers and extractors
//!   into the JSON error envelope

pub mod client_ip;
pub mod envelope;
