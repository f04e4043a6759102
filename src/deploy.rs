//! Deployment attempts and the login → service update sequence

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::command::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::Result;
use crate::image::{ImageRef, ServiceTarget};
use crate::secrets::RegistryCredentials;

/// Where a deployment attempt currently is
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Authenticating,
    Updating,
    Succeeded,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }
}

/// One deployment, created per routed webhook call and dropped once its
/// outcome has been logged
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentAttempt {
    pub id: String,
    pub image: ImageRef,
    pub target: ServiceTarget,
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl DeploymentAttempt {
    pub fn new(image: ImageRef, target: ServiceTarget, require_auth: bool) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            image,
            target,
            stage: if require_auth {
                Stage::Authenticating
            } else {
                Stage::Updating
            },
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn mark_updating(&mut self) {
        self.stage = Stage::Updating;
    }

    pub fn mark_succeeded(&mut self) {
        self.stage = Stage::Succeeded;
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.stage = Stage::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
    }
}

/// Builds Docker Swarm command lines
#[derive(Debug, Clone)]
pub struct SwarmCli {
    pub program: String,
}

impl SwarmCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `docker login`, with the password fed through stdin
    pub fn login(&self, credentials: &RegistryCredentials) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg("login")
            .arg("--username")
            .arg(&credentials.username)
            .arg("--password-stdin")
            .stdin(&credentials.password)
    }

    /// `docker service update` forcing a restart onto `image`
    pub fn update(
        &self,
        target: &ServiceTarget,
        image: &ImageRef,
        with_registry_auth: bool,
    ) -> CommandSpec {
        let mut command = CommandSpec::new(&self.program)
            .arg("service")
            .arg("update")
            .arg(target.as_str())
            .arg("--force");
        if with_registry_auth {
            command = command.arg("--with-registry-auth");
        }
        command.arg(format!("--image={}", image.canonical()))
    }
}

/// Runs deployments against the orchestrator CLI.
///
/// Concurrent deployments of the same service are not serialized; two
/// overlapping webhook deliveries may interleave their commands.
#[derive(Clone)]
pub struct DeploymentExecutor {
    cli: SwarmCli,
    runner: Arc<dyn CommandRunner>,
    log_stdout: bool,
    log_stderr: bool,
}

impl DeploymentExecutor {
    pub fn new(cli: SwarmCli, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            cli,
            runner,
            log_stdout: true,
            log_stderr: true,
        }
    }

    pub fn with_output_logging(mut self, log_stdout: bool, log_stderr: bool) -> Self {
        self.log_stdout = log_stdout;
        self.log_stderr = log_stderr;
        self
    }

    /// Logs in (when `require_auth`) and then updates the service.
    ///
    /// Never retries. The returned attempt is always in a terminal stage and
    /// its outcome has already been logged.
    pub async fn deploy(
        &self,
        image: ImageRef,
        target: ServiceTarget,
        require_auth: bool,
        credentials: &RegistryCredentials,
    ) -> DeploymentAttempt {
        let mut attempt = DeploymentAttempt::new(image, target, require_auth);

        match self.run_stages(&mut attempt, require_auth, credentials).await {
            Ok(()) => {
                attempt.mark_succeeded();
                info!(
                    "Deployment {}: deployed {} to {} successfully and restarted the service.",
                    attempt.id, attempt.image, attempt.target
                );
            }
            Err(e) => {
                error!(
                    "Deployment {}: failed to deploy {} to {}! {}",
                    attempt.id, attempt.image, attempt.target, e
                );
                attempt.mark_failed(e.to_string());
            }
        }

        match serde_json::to_string(&attempt) {
            Ok(record) => debug!("Deployment {}: {}", attempt.id, record),
            Err(e) => debug!("Deployment {}: could not serialize attempt: {}", attempt.id, e),
        }

        attempt
    }

    async fn run_stages(
        &self,
        attempt: &mut DeploymentAttempt,
        require_auth: bool,
        credentials: &RegistryCredentials,
    ) -> Result<()> {
        if require_auth {
            info!(
                "Deployment {}: logging in to registry as '{}'",
                attempt.id, credentials.username
            );
            self.execute(&self.cli.login(credentials)).await?;
        }

        attempt.mark_updating();
        info!(
            "Deployment {}: deploying {} to {}…",
            attempt.id, attempt.image, attempt.target
        );
        self.execute(&self.cli.update(&attempt.target, &attempt.image, require_auth))
            .await?;
        Ok(())
    }

    async fn execute(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let output = self.runner.run(command).await?;
        output.log(self.log_stdout, self.log_stderr);
        output.into_result(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_keeps_password_off_the_command_line() {
        let cli = SwarmCli::new("/usr/bin/docker");
        let login = cli.login(&RegistryCredentials::new("deployer", "s3cret"));
        assert_eq!(
            login.to_string(),
            "/usr/bin/docker login --username deployer --password-stdin"
        );
        assert_eq!(login.stdin.as_deref(), Some("s3cret"));
    }

    #[test]
    fn update_forces_restart_onto_canonical_image() {
        let cli = SwarmCli::new("docker");
        let update = cli.update(
            &ServiceTarget::new("myorg_app_service"),
            &ImageRef::new("myorg/app", "latest"),
            true,
        );
        assert_eq!(
            update.args,
            vec![
                "service",
                "update",
                "myorg_app_service",
                "--force",
                "--with-registry-auth",
                "--image=myorg/app:latest",
            ]
        );
        assert!(update.stdin.is_none());
    }

    #[test]
    fn update_without_auth_drops_registry_flag() {
        let cli = SwarmCli::new("docker");
        let update = cli.update(
            &ServiceTarget::new("svc"),
            &ImageRef::new("myorg/app", "latest"),
            false,
        );
        assert!(!update.args.iter().any(|a| a == "--with-registry-auth"));
        assert!(update.args.iter().any(|a| a == "--force"));
    }

    #[test]
    fn attempt_starts_at_the_first_required_stage() {
        let image = ImageRef::new("a", "b");
        let target = ServiceTarget::new("svc");
        assert_eq!(
            DeploymentAttempt::new(image.clone(), target.clone(), true).stage,
            Stage::Authenticating
        );
        assert_eq!(
            DeploymentAttempt::new(image, target, false).stage,
            Stage::Updating
        );
    }

    #[test]
    fn terminal_stages() {
        let mut attempt = DeploymentAttempt::new(ImageRef::new("a", "b"), ServiceTarget::new("s"), true);
        assert!(!attempt.stage.is_terminal());
        attempt.mark_failed("boom".into());
        assert!(attempt.stage.is_terminal());
        assert!(attempt.completed_at.is_some());
        assert_eq!(attempt.error.as_deref(), Some("boom"));
    }

    #[test]
    fn finished_attempt_serializes_for_the_log() {
        let mut attempt = DeploymentAttempt::new(
            ImageRef::new("myorg/app", "latest"),
            ServiceTarget::new("myorg_app_service"),
            false,
        );
        attempt.mark_succeeded();

        let record = serde_json::to_value(&attempt).expect("attempt serializes");
        assert_eq!(record["stage"], "succeeded");
        assert_eq!(record["target"], "myorg_app_service");
        assert_eq!(record["image"]["repo_name"], "myorg/app");
        assert_eq!(record["image"]["tag"], "latest");
        assert_eq!(record["id"], attempt.id.as_str());
        assert!(record["completed_at"].is_string());
        assert!(record["error"].is_null());
    }
}
