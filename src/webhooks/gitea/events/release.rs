use serde::Deserialize;

use crate::webhooks::gitea::events::{GiteaUser, Repository};

#[derive(Debug, Deserialize)]
pub struct ReleaseEvent {
    #[serde(default)]
    pub secret: String,
    pub action: String,
    pub release: Release,
    pub repository: Repository,
    pub sender: GiteaUser,
}

#[derive(Debug, Deserialize)]
pub struct Release {
    pub tag_name: String,
    /// Release title
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tarball_url: String,
}
