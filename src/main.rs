mod model;
mod server;

use std::process::ExitCode;

use crate::server::{
    config::{Config, Environment},
    startup,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    startup::init_tracing(Environment::from_env()).ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match startup::run(config).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            ExitCode::FAILURE
        }
    }
}
