use serde::Deserialize;

use crate::webhooks::gitea::events::{null_as_default, GiteaUser, Repository};

#[derive(Debug, Deserialize)]
pub struct PushEvent {
    #[serde(default)]
    pub secret: String,
    pub r#ref: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub commits: Vec<Commit>,
    pub repository: Repository,
    pub pusher: GiteaUser,
}

impl PushEvent {
    /// Branch or tag name, e.g. `main` for `refs/heads/main`.
    pub fn branch(&self) -> String {
        self.r#ref.split('/').skip(2).collect::<Vec<_>>().join("/")
    }
}

#[derive(Debug, Deserialize)]
pub struct Commit {
    pub message: String,
    #[serde(default)]
    pub url: String,
}

impl Commit {
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}
