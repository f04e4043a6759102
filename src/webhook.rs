//! Registry push notification payload

use serde::Deserialize;

use crate::image::ImageRef;

/// The two fields read from a Docker Hub push notification. Everything else
/// in the body is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub repository: Repository,
    #[serde(alias = "pushData")]
    pub push_data: PushData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    #[serde(alias = "repoName")]
    pub repo_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushData {
    pub tag: String,
}

impl WebhookPayload {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn image(&self) -> ImageRef {
        ImageRef::new(&self.repository.repo_name, &self.push_data.tag)
    }
}
