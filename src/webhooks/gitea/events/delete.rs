use serde::Deserialize;

use crate::webhooks::gitea::events::Repository;

#[derive(Debug, Deserialize)]
pub struct DeleteEvent {
    #[serde(default)]
    pub secret: String,
    pub r#ref: String,
    pub ref_type: String,
    pub repository: Repository,
}
