use std::path::Path;

use amc_service::config::Config;
use anyhow::{Context, Result};

pub mod db;
pub mod ids;
pub mod schema;
pub mod token;

/// Load the service configuration the same way the server does
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Config::load().context("Failed to load configuration"),
    }
}
