//! Mapping document loading and the immutable runtime configuration

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::CommandRunner;
use crate::error::{AgentError, Result};
use crate::image::{ImageRef, ServiceTarget};
use crate::secrets::{RegistryCredentials, resolve_secrets};
use crate::settings::Settings;

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    service: String,
}

/// One named block of the mapping document
#[derive(Debug, Deserialize)]
struct EnvironmentBlock {
    #[serde(rename = "defaultNotificationOptions", default)]
    default_notification_options: Map<String, Value>,
    #[serde(flatten)]
    images: HashMap<String, ServiceEntry>,
}

/// Image routing table for the selected environment
#[derive(Debug, Clone, Default)]
pub struct ServiceMap {
    services: HashMap<String, ServiceTarget>,
    default_notification_options: Map<String, Value>,
}

impl ServiceMap {
    /// Reads the mapping document at `path` and selects `environment`
    pub fn load(path: &Path, environment: &str) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_document(&contents, environment, path)
    }

    /// Parses a mapping document. `path` is only used for error messages.
    ///
    /// Only the selected block is validated; other top-level keys are left
    /// untouched.
    pub fn from_document(contents: &str, environment: &str, path: &Path) -> Result<Self> {
        let parse_error = |source: serde_json::Error| AgentError::ConfigParse {
            path: path.to_path_buf(),
            source,
        };

        let mut document: Map<String, Value> =
            serde_json::from_str(contents).map_err(parse_error)?;

        let selected = document
            .remove(environment)
            .ok_or_else(|| AgentError::UnknownEnvironment {
                environment: environment.to_string(),
                path: path.to_path_buf(),
            })?;

        let block = EnvironmentBlock::deserialize(selected).map_err(parse_error)?;

        let services = block
            .images
            .into_iter()
            .map(|(image, entry)| (image, ServiceTarget::new(entry.service)))
            .collect();

        Ok(Self {
            services,
            default_notification_options: block.default_notification_options,
        })
    }

    pub fn insert(&mut self, image: &ImageRef, target: ServiceTarget) {
        self.services.insert(image.canonical(), target);
    }

    /// Exact match on the canonical `repo:tag` key
    pub fn lookup(&self, image: &ImageRef) -> Option<&ServiceTarget> {
        self.services.get(&image.canonical())
    }

    pub fn default_notification_options(&self) -> &Map<String, Value> {
        &self.default_notification_options
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Configured image keys, sorted
    pub fn images(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.services.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// Everything the webhook pipeline needs, resolved once at startup and
/// never modified afterwards.
#[derive(Clone)]
pub struct RuntimeConfig {
    pub token: String,
    pub registry: RegistryCredentials,
    pub orchestrator_command: String,
    pub environment: String,
    pub config_path: PathBuf,
    pub services: ServiceMap,
    pub log_stdout: bool,
    pub log_stderr: bool,
}

impl RuntimeConfig {
    /// Runs the startup resolution: optional remote refresh, secrets, then the
    /// mapping document. Every error returned here is fatal.
    pub async fn load<F>(settings: &Settings, runner: &dyn CommandRunner, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(remote) = &settings.remote {
            remote
                .refresh(runner, settings.log_stdout, settings.log_stderr)
                .await?;
        }

        let secrets = resolve_secrets(&settings.secret_sources, env)?;
        let services = ServiceMap::load(&settings.config_path, &settings.environment)?;

        info!(
            "Loaded {} OK: environment '{}' with {} image(s): {:?}",
            settings.config_path.display(),
            settings.environment,
            services.len(),
            services.images()
        );

        Ok(Self {
            token: secrets.token,
            registry: secrets.registry,
            orchestrator_command: settings.orchestrator_command.clone(),
            environment: settings.environment.clone(),
            config_path: settings.config_path.clone(),
            services,
            log_stdout: settings.log_stdout,
            log_stderr: settings.log_stderr,
        })
    }

    /// Registry login is only attempted with a full set of credentials
    pub fn requires_registry_auth(&self) -> bool {
        self.registry.is_complete()
    }

    pub fn default_notification_options(&self) -> &Map<String, Value> {
        self.services.default_notification_options()
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("token", &"<redacted>")
            .field("registry", &self.registry)
            .field("orchestrator_command", &self.orchestrator_command)
            .field("environment", &self.environment)
            .field("config_path", &self.config_path)
            .field("services", &self.services)
            .finish()
    }
}
