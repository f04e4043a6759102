use std::io;
use std::path::PathBuf;

/// Custom error type for swarm_deploy operations
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("You must specify a token to restrict access to the webhook")]
    MissingToken,

    #[error("Failed to read config file '{}': {source}", .path.display())]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Environment '{environment}' is not configured in '{}'", .path.display())]
    UnknownEnvironment { environment: String, path: PathBuf },

    #[error("Failed to pull config from {url}: {message}")]
    RemoteFetchFailed { url: String, message: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {command} (exit code {code:?})\n{stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Helper type for Results that use AgentError
pub type Result<T> = std::result::Result<T, AgentError>;
