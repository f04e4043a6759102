//! Optional refresh of the mapping document from a hosted repository

use std::fmt;
use tracing::info;

use crate::command::{CommandRunner, CommandSpec};
use crate::error::{AgentError, Result};

/// A fetch script that pulls the mapping document from a remote repository.
/// The script receives `GITHUB_TOKEN` and `GITHUB_URL` in its environment.
#[derive(Clone)]
pub struct RemoteConfigSource {
    pub url: String,
    pub token: String,
    pub script: String,
}

impl fmt::Debug for RemoteConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfigSource")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("script", &self.script)
            .finish()
    }
}

impl RemoteConfigSource {
    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.script)
            .env("GITHUB_TOKEN", &self.token)
            .env("GITHUB_URL", &self.url)
    }

    /// Runs the fetch script. Any failure is fatal to startup, since a stale
    /// mapping would decide what gets deployed.
    /// Captured output is logged according to `log_stdout` / `log_stderr`.
    pub async fn refresh(
        &self,
        runner: &dyn CommandRunner,
        log_stdout: bool,
        log_stderr: bool,
    ) -> Result<()> {
        let command = self.command();
        info!("Pulling config from {}", self.url);

        let output = runner
            .run(&command)
            .await
            .map_err(|e| AgentError::RemoteFetchFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        output.log(log_stdout, log_stderr);

        if !output.success() {
            let message = format!(
                "{} exited with code {:?}: {}",
                command,
                output.code,
                output.stderr.trim()
            );
            return Err(AgentError::RemoteFetchFailed {
                url: self.url.clone(),
                message,
            });
        }

        info!("Pulled config from {} OK", self.url);
        Ok(())
    }
}
