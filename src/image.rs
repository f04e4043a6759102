//! Image references and the service names they deploy to

use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A pushed image, identified by repository name and tag.
///
/// Equality and hashing follow the canonical `"{repo_name}:{tag}"` form,
/// which is also the key used in the mapping document.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRef {
    pub repo_name: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repo_name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            tag: tag.into(),
        }
    }

    /// Returns the canonical `repo:tag` string
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.repo_name, self.tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo_name, self.tag)
    }
}

impl PartialEq for ImageRef {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for ImageRef {}

impl Hash for ImageRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

/// Orchestrator-level name of the service to roll to a new image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceTarget(String);

impl ServiceTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
