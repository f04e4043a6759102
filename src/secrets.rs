//! Webhook token and registry credential resolution
//!
//! Each secret is looked up on its own: a configured file wins, otherwise the
//! same-named environment variable is used.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AgentError, Result};

/// Optional file paths that secrets may be read from
#[derive(Debug, Clone, Default)]
pub struct SecretSources {
    pub token_file: Option<PathBuf>,
    pub username_file: Option<PathBuf>,
    pub password_file: Option<PathBuf>,
}

/// Registry login. Either field may be empty, in which case only public
/// images can be pulled.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// True iff both username and password are present
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub token: String,
    pub registry: RegistryCredentials,
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("token", &"<redacted>")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Resolves the token and registry credentials.
///
/// Fails only when no token can be found. Missing registry credentials are
/// logged as a warning and leave the corresponding fields empty.
pub fn resolve_secrets<F>(sources: &SecretSources, env: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let token = resolve_one("token", sources.token_file.as_deref(), "TOKEN", &env);
    let username = resolve_one("username", sources.username_file.as_deref(), "USERNAME", &env);
    let password = resolve_one("password", sources.password_file.as_deref(), "PASSWORD", &env);

    let token = token.ok_or(AgentError::MissingToken)?;

    let registry = RegistryCredentials {
        username: username.unwrap_or_default(),
        password: password.unwrap_or_default(),
    };

    if !registry.is_complete() {
        warn!("{}", missing_credentials_message(&registry));
    }

    Ok(ResolvedSecrets { token, registry })
}

fn resolve_one<F>(name: &str, file: Option<&Path>, env_key: &str, env: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    file.and_then(|path| read_secret_file(name, path))
        .or_else(|| env(env_key).filter(|v| !v.is_empty()))
}

/// Reads and trims a secret file. Read failures are logged and yield `None`.
fn read_secret_file(name: &str, path: &Path) -> Option<String> {
    info!("Reading {} from file: {}", name, path.display());
    match fs::read_to_string(path) {
        Ok(contents) => {
            let value = contents.trim();
            if value.is_empty() {
                warn!("{} file {} is empty", name, path.display());
                None
            } else {
                Some(value.to_string())
            }
        }
        Err(e) => {
            warn!("Error reading {} file {}: {}", name, path.display(), e);
            None
        }
    }
}

fn missing_credentials_message(registry: &RegistryCredentials) -> String {
    let missing = match (registry.username.is_empty(), registry.password.is_empty()) {
        (true, true) => "username or password",
        (true, false) => "username",
        _ => "password",
    };
    format!(
        "No registry {} was specified. You will only be able to pull/deploy public images",
        missing
    )
}
