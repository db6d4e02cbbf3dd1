use serde::Deserialize;

use crate::webhooks::gitea::events::{GiteaUser, Issue, Repository};

#[derive(Debug, Deserialize)]
pub struct IssuesEvent {
    #[serde(default)]
    pub secret: String,
    pub action: String,
    pub issue: Issue,
    pub repository: Repository,
    pub sender: GiteaUser,
}
