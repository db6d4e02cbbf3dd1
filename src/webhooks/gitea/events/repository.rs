use serde::Deserialize;

use crate::webhooks::gitea::events::{GiteaUser, Repository};

#[derive(Debug, Deserialize)]
pub struct RepositoryEvent {
    #[serde(default)]
    pub secret: String,
    pub action: String,
    pub repository: Repository,
    pub sender: GiteaUser,
}
