use serde::{Deserialize, Serialize};

/// JSON envelope returned for every client-facing error.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorDto {
    pub success: bool,
    pub message: String,
}

impl ErrorDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Liveness payload for `GET /health`.
#[derive(Serialize, Deserialize, Debug)]
pub struct HealthDto {
    pub status: String,
    pub env: String,
    pub timestamp: String,
}

/// Database reachability payload for `GET /api/status`.
#[derive(Serialize, Deserialize, Debug)]
pub struct StatusDto {
    pub success: bool,
    pub database: String,
    pub pool: String,
}
