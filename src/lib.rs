pub mod api;
pub mod command;
pub mod config;
pub mod deploy;
pub mod error;
pub mod image;
pub mod logging;
pub mod remote;
pub mod secrets;
pub mod settings;
pub mod webhook;

use std::sync::Arc;

pub use config::RuntimeConfig;
use deploy::DeploymentExecutor;

/// Read-only state shared by all request handlers
pub struct AppState {
    pub config: RuntimeConfig,
    pub executor: DeploymentExecutor,
}

impl AppState {
    pub fn new(config: RuntimeConfig, executor: DeploymentExecutor) -> Self {
        Self { config, executor }
    }
}

pub type SharedState = Arc<AppState>;
