use std::sync::Arc;
use swarm_deploy::command::ProcessRunner;
use swarm_deploy::deploy::{DeploymentExecutor, SwarmCli};
use swarm_deploy::logging::setup_logging;
use swarm_deploy::settings::Settings;
use swarm_deploy::{AppState, RuntimeConfig, api};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let settings = Settings::from_env();

    let _log_guard = match setup_logging(settings.log_directory.clone()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging error: {}", e);
            std::process::exit(1);
        }
    };

    let runner = Arc::new(ProcessRunner);

    let config = match RuntimeConfig::load(&settings, &*runner, |key| {
        std::env::var(key).ok()
    })
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}. Exiting...", e);
            std::process::exit(1);
        }
    };

    let executor = DeploymentExecutor::new(SwarmCli::new(&config.orchestrator_command), runner)
        .with_output_logging(config.log_stdout, config.log_stderr);
    let state = Arc::new(AppState::new(config, executor));
    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(&settings.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", settings.bind_address, e);
            std::process::exit(1);
        }
    };

    info!(
        "Listening for webhooks on http://{}/webhook/<token>",
        settings.bind_address
    );
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
