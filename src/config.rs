use std::path::PathBuf;

use matrix_sdk::ruma::RoomId;
use serde::Deserialize;
use url::Url;

#[derive(Clone, Debug, Deserialize)]
pub struct ProloteaConfig {
    /// The URL for the homeserver we should connect to
    pub matrix_homeserver: Url,
    /// The bot's account username
    pub matrix_username: String,
    /// The bot's account password
    pub matrix_password: String,
    /// Path to a directory where the bot will store Matrix state and current session information.
    pub matrix_state_dir: PathBuf,
    /// Rooms the bot accepts invitations to. When empty, the bot joins any room it is invited to.
    #[serde(default)]
    pub authorized_rooms: Vec<RoomId>,
    /// Shared secret every subscription's webhook token is derived from
    pub webhook_secret: String,
    /// Base URL of the Gitea instance, used to point users at their repository's hook settings
    pub gitea_url: Url,
    /// URL under which this bot's HTTP server is reachable by Gitea
    pub public_url: Url,
    /// Where subscriptions are stored, defaults to `subscriptions.yaml` in `matrix_state_dir`
    #[serde(default)]
    pub subscriptions_file: Option<PathBuf>,
}

impl ProloteaConfig {
    pub fn subscriptions_path(&self) -> PathBuf {
        self.subscriptions_file
            .clone()
            .unwrap_or_else(|| self.matrix_state_dir.join("subscriptions.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
matrix_homeserver: https://matrix.prologin.org
matrix_username: prolotea
matrix_password: hunter2
matrix_state_dir: /var/lib/prolotea
webhook_secret: s3cr3t
gitea_url: https://git.prologin.org
public_url: https://bot.prologin.org
"#;

    #[test]
    fn parse_minimal_config() {
        let config: ProloteaConfig = serde_yaml::from_str(MINIMAL).unwrap();

        assert_eq!(config.matrix_homeserver.as_str(), "https://matrix.prologin.org/");
        assert_eq!(config.webhook_secret, "s3cr3t");
        assert!(config.authorized_rooms.is_empty());
        assert_eq!(
            config.subscriptions_path(),
            PathBuf::from("/var/lib/prolotea/subscriptions.yaml")
        );
    }

    #[test]
    fn parse_full_config() {
        let yaml = format!(
            "{}authorized_rooms:\n  - \"!aaaa:prologin.org\"\nsubscriptions_file: /etc/prolotea/subs.yaml\n",
            MINIMAL
        );
        let config: ProloteaConfig = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(config.authorized_rooms.len(), 1);
        assert_eq!(config.authorized_rooms[0].as_str(), "!aaaa:prologin.org");
        assert_eq!(
            config.subscriptions_path(),
            PathBuf::from("/etc/prolotea/subs.yaml")
        );
    }

    #[test]
    fn invalid_room_id_is_rejected() {
        let yaml = format!("{}authorized_rooms:\n  - \"not a room\"\n", MINIMAL);
        assert!(serde_yaml::from_str::<ProloteaConfig>(&yaml).is_err());
    }
}
