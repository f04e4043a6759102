//! Process settings read from environment variables

use std::path::PathBuf;

use crate::remote::RemoteConfigSource;
use crate::secrets::SecretSources;

const DEFAULT_PORT: &str = "3000";
const DEFAULT_DOCKER_COMMAND: &str = "/usr/bin/docker";
const DEFAULT_ENVIRONMENT: &str = "production";
const DEFAULT_CONFIG_DIR: &str = "/usr/src/app/config";
const DEFAULT_CONFIG_FILE: &str = "config.json";
const DEFAULT_FETCH_SCRIPT: &str = "./scripts/fetchConfigFromGithub.sh";

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub orchestrator_command: String,
    pub environment: String,
    pub config_path: PathBuf,
    pub secret_sources: SecretSources,
    pub log_stdout: bool,
    pub log_stderr: bool,
    pub remote: Option<RemoteConfigSource>,
    pub log_directory: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_address = get("BIND_ADDRESS").unwrap_or_else(|| {
            format!(
                "0.0.0.0:{}",
                get("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string())
            )
        });

        let config_path = get("CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|| {
            PathBuf::from(get("CONFIG_DIR").unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string()))
                .join(get("CONFIG_FILE").unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()))
        });

        let remote = match (get("GITHUB_TOKEN"), get("GITHUB_URL")) {
            (Some(token), Some(url)) => Some(RemoteConfigSource {
                url,
                token,
                script: get("CONFIG_FETCH_SCRIPT")
                    .unwrap_or_else(|| DEFAULT_FETCH_SCRIPT.to_string()),
            }),
            _ => None,
        };

        Self {
            bind_address,
            orchestrator_command: get("DOCKER")
                .unwrap_or_else(|| DEFAULT_DOCKER_COMMAND.to_string()),
            environment: get("CONFIG").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            config_path,
            secret_sources: SecretSources {
                token_file: get("TOKEN_FILE").map(PathBuf::from),
                username_file: get("USERNAME_FILE").map(PathBuf::from),
                password_file: get("PASSWORD_FILE").map(PathBuf::from),
            },
            log_stdout: get("LOG_STD_OUT").map(|v| parse_flag(&v)).unwrap_or(true),
            log_stderr: get("LOG_STD_ERR").map(|v| parse_flag(&v)).unwrap_or(true),
            remote,
            log_directory: get("LOG_DIR").map(PathBuf::from),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
