#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use swarm_deploy::command::{CommandFuture, CommandOutput, CommandRunner, CommandSpec};
use swarm_deploy::config::{RuntimeConfig, ServiceMap};
use swarm_deploy::deploy::{DeploymentExecutor, SwarmCli};
use swarm_deploy::image::{ImageRef, ServiceTarget};
use swarm_deploy::secrets::RegistryCredentials;
use swarm_deploy::{AppState, SharedState};
use tokio::sync::mpsc;

pub const TOKEN: &str = "myToken123456";
pub const DOCKER: &str = "/usr/bin/docker";

/// Records every command and answers with a scripted exit code.
/// Commands whose program or first argument matches `fail_on` exit with
/// code 1.
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_on: Option<&'static str>,
    notify: Option<mpsc::UnboundedSender<CommandSpec>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            notify: None,
        }
    }

    pub fn failing_on(subcommand: &'static str) -> Self {
        Self {
            fail_on: Some(subcommand),
            ..Self::new()
        }
    }

    /// Also forwards each command to the returned channel as it runs
    pub fn with_channel(mut self) -> (Self, mpsc::UnboundedReceiver<CommandSpec>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notify = Some(tx);
        (self, rx)
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> CommandFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(command.clone());
            if let Some(tx) = &self.notify {
                let _ = tx.send(command.clone());
            }
            let failing = self.fail_on.filter(|name| {
                command.program == *name || command.args.first().map(String::as_str) == Some(*name)
            });
            if let Some(name) = failing {
                Ok(CommandOutput {
                    code: Some(1),
                    stdout: String::new(),
                    stderr: format!("{} failed\n", name),
                })
            } else {
                Ok(CommandOutput {
                    code: Some(0),
                    stdout: "ok\n".to_string(),
                    stderr: String::new(),
                })
            }
        })
    }
}

/// Mapping with `myorg/app:latest -> myorg_app_service`
pub fn services() -> ServiceMap {
    let mut map = ServiceMap::default();
    map.insert(
        &ImageRef::new("myorg/app", "latest"),
        ServiceTarget::new("myorg_app_service"),
    );
    map
}

pub fn runtime_config(registry: RegistryCredentials) -> RuntimeConfig {
    RuntimeConfig {
        token: TOKEN.to_string(),
        registry,
        orchestrator_command: DOCKER.to_string(),
        environment: "production".to_string(),
        config_path: "config.json".into(),
        services: services(),
        log_stdout: true,
        log_stderr: true,
    }
}

pub fn credentials() -> RegistryCredentials {
    RegistryCredentials::new("deployer", "s3cret")
}

pub fn executor(runner: Arc<RecordingRunner>) -> DeploymentExecutor {
    DeploymentExecutor::new(SwarmCli::new(DOCKER), runner)
}

pub fn state(registry: RegistryCredentials, runner: Arc<RecordingRunner>) -> SharedState {
    Arc::new(AppState::new(runtime_config(registry), executor(runner)))
}

pub fn push_body(repo_name: &str, tag: &str) -> String {
    serde_json::json!({
        "callback_url": "https://registry.hub.docker.com/u/myorg/app/hook/abc/",
        "push_data": {"pusher": "ci", "tag": tag},
        "repository": {"repo_name": repo_name, "namespace": "myorg", "name": "app"}
    })
    .to_string()
}

/// Waits for the next recorded command, failing the test after a few seconds
pub async fn next_command(rx: &mut mpsc::UnboundedReceiver<CommandSpec>) -> CommandSpec {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a command")
        .expect("runner channel closed")
}
