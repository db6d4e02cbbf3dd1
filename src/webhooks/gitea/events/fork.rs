use serde::Deserialize;

use crate::webhooks::gitea::events::Repository;

/// Gitea names the original repository `forkee`, and the new fork `repository`.
#[derive(Debug, Deserialize)]
pub struct ForkEvent {
    #[serde(default)]
    pub secret: String,
    pub forkee: Repository,
    pub repository: Repository,
}
